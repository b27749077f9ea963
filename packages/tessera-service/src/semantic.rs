use std::{slice, sync::Arc};

use crate::{BoxFuture, EmbeddingProvider, Error, Result, SearchMethod};
use tessera_config::EmbeddingProviderConfig;
use tessera_domain::{Document, DocumentUpdate, Record, ScoredRecord, TextQuery, record};
use tessera_index::ScopedIndex;
use tessera_storage::{FetchOptions, IndexInfo, QueryRequest, UpdateRequest};

/// Where document text is turned into vectors.
#[derive(Clone)]
pub enum SemanticMode {
	/// Embeds locally and stores explicit vectors of any width.
	Provider { provider: Arc<dyn EmbeddingProvider>, cfg: EmbeddingProviderConfig },
	/// Passes raw text through and lets the vector store embed it.
	Server,
}

/// Dense retrieval over one scope of the shared sharded index.
pub struct SemanticMethod {
	index: ScopedIndex,
	mode: SemanticMode,
}
impl SemanticMethod {
	pub fn new(index: ScopedIndex, mode: SemanticMode) -> Self {
		Self { index, mode }
	}

	pub fn index(&self) -> &ScopedIndex {
		&self.index
	}

	pub async fn upsert(&self, namespace: &str, documents: Vec<Document>) -> Result<()> {
		if documents.is_empty() {
			return Ok(());
		}

		let count = documents.len();
		let records = self.records(documents).await?;

		self.index.upsert(namespace, records).await?;

		tracing::debug!(namespace, documents = count, "Upserted semantic documents.");

		Ok(())
	}

	pub async fn update(&self, namespace: &str, update: DocumentUpdate) -> Result<bool> {
		match update {
			DocumentUpdate::Metadata { id, metadata } => Ok(self
				.index
				.update(namespace, UpdateRequest { id, vector: None, metadata: Some(metadata) })
				.await?),
			DocumentUpdate::Vector { id, vector } => match self.mode {
				SemanticMode::Provider { .. } => Ok(self
					.index
					.update(namespace, UpdateRequest { id, vector: Some(vector), metadata: None })
					.await?),
				SemanticMode::Server => Err(Error::InvalidRequest {
					message: "Vectors cannot be set when the vector store embeds text.".to_string(),
				}),
			},
			DocumentUpdate::Text { id, text, metadata } => {
				let options = FetchOptions { include_metadata: true, ..Default::default() };
				let existing = self.index.fetch(namespace, slice::from_ref(&id), options).await?;
				let Some(Some(current)) = existing.into_iter().next() else {
					return Ok(false);
				};
				let document = Document {
					id,
					text,
					metadata: record::merge_metadata(current.metadata, metadata),
				};
				let records = self.records(vec![document]).await?;

				self.index.upsert(namespace, records).await?;

				Ok(true)
			},
		}
	}

	pub async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
		Ok(self.index.delete(namespace, ids).await?)
	}

	pub async fn query(&self, namespace: &str, query: &TextQuery) -> Result<Vec<ScoredRecord>> {
		let request = match self.embed(slice::from_ref(&query.text)).await? {
			Some(mut vectors) => match vectors.pop() {
				Some(vector) => QueryRequest::by_vector(vector, query.top_k),
				None => return Ok(Vec::new()),
			},
			None => QueryRequest::by_data(query.text.clone(), query.top_k),
		}
		.include_vectors(query.include_vectors)
		.include_metadata(query.include_metadata);

		Ok(self.index.query(namespace, request).await?)
	}

	async fn embed(&self, texts: &[String]) -> Result<Option<Vec<Vec<f32>>>> {
		let SemanticMode::Provider { provider, cfg } = &self.mode else {
			return Ok(None);
		};
		let vectors = provider.embed(cfg, texts).await?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} texts.",
					vectors.len(),
					texts.len()
				),
			});
		}

		Ok(Some(vectors))
	}

	async fn records(&self, documents: Vec<Document>) -> Result<Vec<Record>> {
		let texts: Vec<String> = documents.iter().map(|document| document.text.clone()).collect();

		Ok(match self.embed(&texts).await? {
			Some(vectors) => documents
				.into_iter()
				.zip(vectors)
				.map(|(document, vector)| Record {
					id: document.id,
					vector: Some(vector),
					data: Some(document.text),
					metadata: document.metadata,
				})
				.collect(),
			None => documents
				.into_iter()
				.map(|document| Record::with_data(document.id, document.text).metadata(document.metadata))
				.collect(),
		})
	}
}

impl SearchMethod for SemanticMethod {
	fn name(&self) -> &'static str {
		"semantic"
	}

	fn upsert<'a>(
		&'a self,
		namespace: &'a str,
		documents: Vec<Document>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(SemanticMethod::upsert(self, namespace, documents))
	}

	fn update<'a>(
		&'a self,
		namespace: &'a str,
		update: DocumentUpdate,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(SemanticMethod::update(self, namespace, update))
	}

	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>> {
		Box::pin(SemanticMethod::delete(self, namespace, ids))
	}

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		query: &'a TextQuery,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>> {
		Box::pin(SemanticMethod::query(self, namespace, query))
	}

	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.index.reset(namespace).await?) })
	}

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(self.index.delete_namespace(namespace).await?) })
	}

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>> {
		Box::pin(async move { Ok(self.index.info().await?) })
	}

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { Ok(self.index.list_namespaces().await?) })
	}
}
