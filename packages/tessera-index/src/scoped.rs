use std::{collections::BTreeMap, sync::Arc};

use crate::{Layout, Result, ShardedIndex};
use tessera_domain::{Record, ScoredRecord};
use tessera_storage::{
	FetchOptions, IndexInfo, QueryRequest, RangePage, RangeRequest, UpdateRequest,
};

/// A view of a [`ShardedIndex`] that keeps one search method's namespaces apart from the others.
///
/// Namespace `ns` is stored as `{ns}.{scope}`; the default namespace is stored as `{scope}`.
#[derive(Clone)]
pub struct ScopedIndex {
	index: Arc<ShardedIndex>,
	scope: String,
}
impl ScopedIndex {
	pub fn new(index: Arc<ShardedIndex>, scope: impl Into<String>) -> Self {
		Self { index, scope: scope.into() }
	}

	pub fn scope(&self) -> &str {
		&self.scope
	}

	pub fn inner(&self) -> &Arc<ShardedIndex> {
		&self.index
	}

	pub fn scoped(&self, namespace: &str) -> String {
		if namespace.is_empty() {
			self.scope.clone()
		} else {
			format!("{namespace}.{}", self.scope)
		}
	}

	/// Maps a stored namespace back to the caller's namespace, if it belongs to this scope.
	pub fn unscoped<'a>(&self, stored: &'a str) -> Option<&'a str> {
		if stored == self.scope {
			return Some("");
		}

		stored.strip_suffix(self.scope.as_str())?.strip_suffix('.').filter(|ns| !ns.is_empty())
	}

	pub async fn layout(&self) -> Result<Layout> {
		self.index.layout().await
	}

	pub async fn upsert(&self, namespace: &str, records: Vec<Record>) -> Result<()> {
		self.index.upsert(&self.scoped(namespace), records).await
	}

	pub async fn query(&self, namespace: &str, request: QueryRequest) -> Result<Vec<ScoredRecord>> {
		self.index.query(&self.scoped(namespace), request).await
	}

	pub async fn fetch(
		&self,
		namespace: &str,
		ids: &[String],
		options: FetchOptions,
	) -> Result<Vec<Option<Record>>> {
		self.index.fetch(&self.scoped(namespace), ids, options).await
	}

	pub async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
		self.index.delete(&self.scoped(namespace), ids).await
	}

	pub async fn update(&self, namespace: &str, request: UpdateRequest) -> Result<bool> {
		self.index.update(&self.scoped(namespace), request).await
	}

	pub async fn range(&self, namespace: &str, request: RangeRequest) -> Result<RangePage> {
		self.index.range(&self.scoped(namespace), request).await
	}

	pub async fn reset(&self, namespace: &str) -> Result<()> {
		self.index.reset(&self.scoped(namespace)).await
	}

	pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
		self.index.delete_namespace(&self.scoped(namespace)).await
	}

	/// Index info restricted to this scope, keyed by caller namespace.
	pub async fn info(&self) -> Result<IndexInfo> {
		let info = self.index.info().await?;
		let namespaces: BTreeMap<String, usize> = info
			.namespaces
			.into_iter()
			.filter_map(|(stored, count)| {
				self.unscoped(&stored).map(|namespace| (namespace.to_string(), count))
			})
			.collect();

		Ok(IndexInfo { namespaces, ..info })
	}

	pub async fn list_namespaces(&self) -> Result<Vec<String>> {
		Ok(self
			.index
			.list_namespaces()
			.await?
			.iter()
			.filter_map(|stored| self.unscoped(stored).map(str::to_string))
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use tessera_domain::Similarity;
	use tessera_storage::memory::MemoryVectorStore;

	use super::*;

	fn scoped(scope: &str) -> ScopedIndex {
		let store = Arc::new(MemoryVectorStore::new(2, Similarity::Cosine));

		ScopedIndex::new(Arc::new(ShardedIndex::new(store, true)), scope)
	}

	#[test]
	fn maps_namespaces() {
		let index = scoped("bm25");

		assert_eq!(index.scoped(""), "bm25");
		assert_eq!(index.scoped("notes"), "notes.bm25");
		assert_eq!(index.unscoped("bm25"), Some(""));
		assert_eq!(index.unscoped("notes.bm25"), Some("notes"));
		assert_eq!(index.unscoped("a.b.bm25"), Some("a.b"));
		assert_eq!(index.unscoped("notes.semantic"), None);
		assert_eq!(index.unscoped("xbm25"), None);
		assert_eq!(index.unscoped(".bm25"), None);
	}
}
