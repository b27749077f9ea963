use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use futures::future;
use serde::{Deserialize, Serialize};

use crate::{
	BoxFuture, EmbeddingProvider, Error, Result, SearchMethod, SemanticMethod, SemanticMode,
};
use tessera_bm25::Bm25Engine;
use tessera_config::Config;
use tessera_domain::{
	Bm25Params, Document, DocumentUpdate, RebuildPolicy, ScoredRecord, TextQuery,
};
use tessera_fusion::Fusion;
use tessera_index::{ScopedIndex, ShardedIndex};
use tessera_storage::{IndexInfo, MetadataStore, VectorStore};

pub const BM25_SCOPE: &str = "bm25";
pub const SEMANTIC_SCOPE: &str = "semantic";

/// Which search methods an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
	Bm25,
	Semantic,
	/// Both methods; queries are fused.
	Hybrid,
}
impl Target {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Bm25 => "bm25",
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}
}
impl FromStr for Target {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"bm25" => Ok(Self::Bm25),
			"semantic" => Ok(Self::Semantic),
			"hybrid" => Ok(Self::Hybrid),
			other => Err(Error::InvalidRequest {
				message: format!("Unknown search method {other:?}. Use bm25, semantic, or hybrid."),
			}),
		}
	}
}
impl fmt::Display for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct QueryResponse {
	pub items: Vec<ScoredRecord>,
	/// Methods that were skipped because their index was still initializing.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub not_ready: Vec<&'static str>,
}

/// The search methods and fusion strategy, built once and shared by every caller.
pub struct TesseraService {
	bm25: Arc<dyn SearchMethod>,
	semantic: Arc<dyn SearchMethod>,
	fusion: Box<dyn Fusion>,
	top_k: usize,
}
impl TesseraService {
	pub fn new(
		bm25: Arc<dyn SearchMethod>,
		semantic: Arc<dyn SearchMethod>,
		fusion: Box<dyn Fusion>,
		top_k: usize,
	) -> Self {
		Self { bm25, semantic, fusion, top_k }
	}

	/// Wires both methods onto one sharded index, each under its own scope.
	pub fn from_config(
		cfg: &Config,
		vectors: Arc<dyn VectorStore>,
		metadata: Arc<dyn MetadataStore>,
		embedder: Arc<dyn EmbeddingProvider>,
	) -> Result<Self> {
		let index = Arc::new(ShardedIndex::new(vectors, cfg.sharding.wait_for_ready));
		let bm25 = Bm25Engine::new(ScopedIndex::new(index.clone(), BM25_SCOPE), metadata)
			.with_params(Bm25Params { k: cfg.bm25.k, b: cfg.bm25.b })
			.with_policy(RebuildPolicy {
				document_ratio: cfg.bm25.rebuild_document_ratio,
				length_drift: cfg.bm25.rebuild_length_drift,
			});
		let mode = match cfg.semantic.mode.as_str() {
			"provider" =>
				SemanticMode::Provider { provider: embedder, cfg: cfg.providers.embedding.clone() },
			"server" => SemanticMode::Server,
			other => {
				return Err(Error::InvalidRequest {
					message: format!("Unknown semantic mode {other:?}."),
				});
			},
		};
		let semantic = SemanticMethod::new(ScopedIndex::new(index, SEMANTIC_SCOPE), mode);
		let fusion = tessera_fusion::from_config(&cfg.fusion)
			.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;

		tracing::info!(
			semantic_mode = cfg.semantic.mode.as_str(),
			fusion = cfg.fusion.method.as_str(),
			"Search service initialized."
		);

		Ok(Self::new(Arc::new(bm25), Arc::new(semantic), fusion, cfg.search.top_k as usize))
	}

	/// Result count used when a caller does not ask for one.
	pub fn top_k(&self) -> usize {
		self.top_k
	}

	pub async fn upsert(
		&self,
		target: Target,
		namespace: &str,
		documents: Vec<Document>,
	) -> Result<()> {
		self.each(target, |method| method.upsert(namespace, documents.clone())).await?;

		Ok(())
	}

	/// Per method, whether the document existed.
	pub async fn update(
		&self,
		target: Target,
		namespace: &str,
		update: DocumentUpdate,
	) -> Result<BTreeMap<&'static str, bool>> {
		self.each(target, |method| method.update(namespace, update.clone())).await
	}

	/// Per method, how many of `ids` existed.
	pub async fn delete(
		&self,
		target: Target,
		namespace: &str,
		ids: &[String],
	) -> Result<BTreeMap<&'static str, usize>> {
		self.each(target, |method| method.delete(namespace, ids)).await
	}

	pub async fn reset(&self, target: Target, namespace: &str) -> Result<()> {
		self.each(target, |method| method.reset(namespace)).await?;

		Ok(())
	}

	pub async fn delete_namespace(&self, target: Target, namespace: &str) -> Result<()> {
		self.each(target, |method| method.delete_namespace(namespace)).await?;

		Ok(())
	}

	pub async fn info(&self, target: Target) -> Result<BTreeMap<&'static str, IndexInfo>> {
		self.each(target, |method| method.info()).await
	}

	pub async fn list_namespaces(
		&self,
		target: Target,
	) -> Result<BTreeMap<&'static str, Vec<String>>> {
		self.each(target, |method| method.list_namespaces()).await
	}

	/// Runs the addressed methods concurrently and fuses their lists when there is more than one.
	///
	/// A method whose index is not ready contributes an empty list and is named in the response.
	pub async fn query(
		&self,
		target: Target,
		namespace: &str,
		query: &TextQuery,
	) -> Result<QueryResponse> {
		let methods = self.methods(target);
		let results =
			future::join_all(methods.iter().map(|method| method.query(namespace, query))).await;
		let mut lists = Vec::with_capacity(methods.len());
		let mut not_ready = Vec::new();

		for (method, result) in methods.iter().zip(results) {
			match result {
				Ok(list) => lists.push(list),
				Err(Error::NotReady) => {
					tracing::warn!(
						method = method.name(),
						namespace,
						"Search method is not ready. Treating its results as empty."
					);

					not_ready.push(method.name());
					lists.push(Vec::new());
				},
				Err(err) => return Err(err),
			}
		}

		let mut items = if lists.len() == 1 {
			lists.pop().unwrap_or_default()
		} else {
			self.fusion.fuse(lists)
		};

		items.truncate(query.top_k);

		Ok(QueryResponse { items, not_ready })
	}

	pub async fn query_many(
		&self,
		target: Target,
		namespace: &str,
		queries: &[TextQuery],
	) -> Result<Vec<QueryResponse>> {
		future::try_join_all(queries.iter().map(|query| self.query(target, namespace, query)))
			.await
	}

	fn methods(&self, target: Target) -> Vec<&dyn SearchMethod> {
		match target {
			Target::Bm25 => vec![self.bm25.as_ref()],
			Target::Semantic => vec![self.semantic.as_ref()],
			Target::Hybrid => vec![self.bm25.as_ref(), self.semantic.as_ref()],
		}
	}

	async fn each<'a, T, F>(&'a self, target: Target, call: F) -> Result<BTreeMap<&'static str, T>>
	where
		F: Fn(&'a dyn SearchMethod) -> BoxFuture<'a, Result<T>>,
	{
		let methods = self.methods(target);
		let results = future::try_join_all(methods.iter().map(|method| call(*method))).await?;

		Ok(methods.iter().map(|method| method.name()).zip(results).collect())
	}
}
