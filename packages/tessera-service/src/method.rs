use futures::future;

use crate::{BoxFuture, Result};
use tessera_bm25::Bm25Engine;
use tessera_domain::{Document, DocumentUpdate, ScoredRecord, TextQuery};
use tessera_storage::IndexInfo;

/// One retrieval strategy over a text corpus, addressed by namespace.
pub trait SearchMethod
where
	Self: Send + Sync,
{
	fn name(&self) -> &'static str;

	fn upsert<'a>(&'a self, namespace: &'a str, documents: Vec<Document>)
	-> BoxFuture<'a, Result<()>>;

	/// Returns whether the document existed.
	fn update<'a>(&'a self, namespace: &'a str, update: DocumentUpdate)
	-> BoxFuture<'a, Result<bool>>;

	/// Returns how many of `ids` existed.
	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>>;

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		query: &'a TextQuery,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>>;

	fn query_many<'a>(
		&'a self,
		namespace: &'a str,
		queries: &'a [TextQuery],
	) -> BoxFuture<'a, Result<Vec<Vec<ScoredRecord>>>> {
		Box::pin(async move {
			future::try_join_all(queries.iter().map(|query| self.query(namespace, query))).await
		})
	}

	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>>;

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>>;

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>>;

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>>;
}

impl SearchMethod for Bm25Engine {
	fn name(&self) -> &'static str {
		"bm25"
	}

	fn upsert<'a>(
		&'a self,
		namespace: &'a str,
		documents: Vec<Document>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(Bm25Engine::upsert(self, namespace, documents).await?) })
	}

	fn update<'a>(
		&'a self,
		namespace: &'a str,
		update: DocumentUpdate,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(Bm25Engine::update(self, namespace, update).await?) })
	}

	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move { Ok(Bm25Engine::delete(self, namespace, ids).await?) })
	}

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		query: &'a TextQuery,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>> {
		Box::pin(async move { Ok(Bm25Engine::query(self, namespace, query).await?) })
	}

	fn query_many<'a>(
		&'a self,
		namespace: &'a str,
		queries: &'a [TextQuery],
	) -> BoxFuture<'a, Result<Vec<Vec<ScoredRecord>>>> {
		Box::pin(async move { Ok(Bm25Engine::query_many(self, namespace, queries).await?) })
	}

	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(Bm25Engine::reset(self, namespace).await?) })
	}

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(Bm25Engine::delete_namespace(self, namespace).await?) })
	}

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>> {
		Box::pin(async move { Ok(Bm25Engine::info(self).await?) })
	}

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move { Ok(Bm25Engine::list_namespaces(self).await?) })
	}
}
