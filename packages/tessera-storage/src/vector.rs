use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BoxFuture, Result};
use tessera_domain::{Metadata, Record, ScoredRecord, Similarity};

/// A fixed-width, namespace-partitioned vector index.
///
/// Scores follow the normalization documented on [`Similarity`]. The empty string is the default
/// namespace.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, namespace: &'a str, records: Vec<Record>) -> BoxFuture<'a, Result<()>>;

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		request: QueryRequest,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>>;

	/// One slot per requested id, `None` where the id is unknown.
	fn fetch<'a>(
		&'a self,
		namespace: &'a str,
		ids: &'a [String],
		options: FetchOptions,
	) -> BoxFuture<'a, Result<Vec<Option<Record>>>>;

	/// Returns how many of `ids` existed.
	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>>;

	/// Returns whether the id existed.
	fn update<'a>(&'a self, namespace: &'a str, request: UpdateRequest)
	-> BoxFuture<'a, Result<bool>>;

	fn range<'a>(
		&'a self,
		namespace: &'a str,
		request: RangeRequest,
	) -> BoxFuture<'a, Result<RangePage>>;

	/// Removes every vector but keeps the namespace.
	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>>;

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>>;

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>>;

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>>;
}

/// Either `vector` or `data` is set. `data` queries rely on server-side embedding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryRequest {
	pub vector: Option<Vec<f32>>,
	pub data: Option<String>,
	pub top_k: usize,
	pub include_vectors: bool,
	pub include_metadata: bool,
}
impl QueryRequest {
	pub fn by_vector(vector: Vec<f32>, top_k: usize) -> Self {
		Self { vector: Some(vector), top_k, include_metadata: true, ..Default::default() }
	}

	pub fn by_data(data: impl Into<String>, top_k: usize) -> Self {
		Self { data: Some(data.into()), top_k, include_metadata: true, ..Default::default() }
	}

	pub fn include_vectors(mut self, include: bool) -> Self {
		self.include_vectors = include;

		self
	}

	pub fn include_metadata(mut self, include: bool) -> Self {
		self.include_metadata = include;

		self
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
	pub include_vectors: bool,
	pub include_metadata: bool,
	pub include_data: bool,
}
impl FetchOptions {
	pub fn everything() -> Self {
		Self { include_vectors: true, include_metadata: true, include_data: true }
	}
}

/// Replaces the vector and/or shallow-merges metadata of one stored record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateRequest {
	pub id: String,
	pub vector: Option<Vec<f32>>,
	pub metadata: Option<Metadata>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RangeRequest {
	/// Opaque position of the first record of the page. `None` starts from the beginning.
	pub cursor: Option<String>,
	pub limit: usize,
	pub include_vectors: bool,
	pub include_metadata: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangePage {
	pub items: Vec<Record>,
	/// Cursor of the next page; `None` once the namespace is exhausted.
	pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
	pub dimension: usize,
	pub similarity: Similarity,
	/// Vector count per namespace.
	pub namespaces: BTreeMap<String, usize>,
}
impl IndexInfo {
	pub fn vector_count(&self) -> usize {
		self.namespaces.values().sum()
	}
}
