use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	sync::{Arc, Mutex},
};

use futures::future;
use tokio::sync::OnceCell;

use crate::{Error, Result, merge, partition};
use tessera_domain::{Record, ScoredRecord, Similarity};
use tessera_storage::{
	FetchOptions, IndexInfo, QueryRequest, RangePage, RangeRequest, UpdateRequest, VectorStore,
};

/// Fixed properties of the backing store, discovered once through `info`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
	pub dimension: usize,
	pub similarity: Similarity,
}

struct Shared {
	store: Arc<dyn VectorStore>,
	layout: OnceCell<Layout>,
	partitions: Mutex<HashMap<String, usize>>,
}
impl Shared {
	async fn discover(&self) -> Result<Layout> {
		let layout = self
			.layout
			.get_or_try_init(|| async {
				let info = self.store.info().await?;
				let namespaces = {
					let mut partitions =
						self.partitions.lock().unwrap_or_else(|err| err.into_inner());

					for backing in info.namespaces.keys() {
						let (namespace, index) = partition::parse_backing_namespace(backing);
						let count = partitions.entry(namespace.to_string()).or_insert(1);

						*count = (*count).max(index + 1);
					}

					partitions.len()
				};

				tracing::info!(
					dimension = info.dimension,
					similarity = info.similarity.as_str(),
					namespaces,
					"Discovered vector store layout."
				);

				Ok::<_, Error>(Layout { dimension: info.dimension, similarity: info.similarity })
			})
			.await?;

		Ok(*layout)
	}
}

/// One logical vector index of unbounded width on top of a fixed-width [`VectorStore`].
///
/// Vectors wider than the store are cut into partitions stored under
/// `{namespace}.{i}.shard` (partition zero keeps the bare name). Results are merged back by id.
/// Query scores are recombined per similarity and approximate the unsplit score.
pub struct ShardedIndex {
	shared: Arc<Shared>,
	wait_for_ready: bool,
}
impl ShardedIndex {
	/// Starts layout discovery in the background when a Tokio runtime is available.
	///
	/// With `wait_for_ready` unset, calls issued before discovery finishes fail with
	/// [`Error::NotReady`].
	pub fn new(store: Arc<dyn VectorStore>, wait_for_ready: bool) -> Self {
		let shared = Arc::new(Shared {
			store,
			layout: OnceCell::new(),
			partitions: Mutex::new(HashMap::new()),
		});

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			let background = shared.clone();

			handle.spawn(async move {
				if let Err(err) = background.discover().await {
					tracing::warn!(error = %err, "Vector store layout discovery failed.");
				}
			});
		}

		Self { shared, wait_for_ready }
	}

	pub fn store(&self) -> &Arc<dyn VectorStore> {
		&self.shared.store
	}

	pub async fn layout(&self) -> Result<Layout> {
		if let Some(layout) = self.shared.layout.get() {
			return Ok(*layout);
		}
		if !self.wait_for_ready {
			return Err(Error::NotReady);
		}

		self.shared.discover().await
	}

	pub fn is_ready(&self) -> bool {
		self.shared.layout.initialized()
	}

	/// Partitions currently spanned by `namespace`; at least one.
	pub fn partitions(&self, namespace: &str) -> usize {
		self.lock_partitions().get(namespace).copied().unwrap_or(1)
	}

	/// Partitions of `namespace` once discovery has loaded the stored layout.
	async fn spanned(&self, namespace: &str) -> Result<(Layout, usize)> {
		let layout = self.layout().await?;

		Ok((layout, self.partitions(namespace)))
	}

	fn lock_partitions(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
		self.shared.partitions.lock().unwrap_or_else(|err| err.into_inner())
	}

	/// Raises the partition count of `namespace` to at least `partitions` and returns the count.
	fn widen(&self, namespace: &str, partitions: usize) -> usize {
		let mut map = self.lock_partitions();
		let count = map.entry(namespace.to_string()).or_insert(1);

		if partitions > *count {
			tracing::info!(namespace, from = *count, to = partitions, "Widened namespace partitions.");

			*count = partitions;
		}

		*count
	}

	pub async fn upsert(&self, namespace: &str, records: Vec<Record>) -> Result<()> {
		let (vectors, payloads): (Vec<Record>, Vec<Record>) =
			records.into_iter().partition(|record| record.vector.is_some());

		if !payloads.is_empty() {
			self.shared.store.upsert(namespace, payloads).await?;
		}
		if vectors.is_empty() {
			return Ok(());
		}

		let layout = self.layout().await?;
		let width = vectors.iter().filter_map(|record| record.vector.as_ref()).map(Vec::len).max();
		let partitions =
			self.widen(namespace, partition::partition_count(width.unwrap_or(0), layout.dimension));
		let mut batches: Vec<Vec<Record>> = (0..partitions).map(|_| Vec::new()).collect();

		for record in vectors {
			let chunks = partition::split(
				record.vector.as_deref().unwrap_or_default(),
				layout.dimension,
				partitions,
			);

			for (index, chunk) in chunks.into_iter().enumerate() {
				batches[index].push(Record {
					id: record.id.clone(),
					vector: Some(chunk),
					data: if index == 0 { record.data.clone() } else { None },
					metadata: record.metadata.clone(),
				});
			}
		}

		let backing: Vec<String> =
			(0..partitions).map(|index| partition::backing_namespace(namespace, index)).collect();
		let results = future::join_all(
			batches
				.into_iter()
				.zip(backing.iter())
				.map(|(batch, backing)| self.shared.store.upsert(backing, batch)),
		)
		.await;

		settle("upsert", results)?;

		Ok(())
	}

	pub async fn query(&self, namespace: &str, request: QueryRequest) -> Result<Vec<ScoredRecord>> {
		if request.vector.is_none() {
			return Ok(self.shared.store.query(namespace, request).await?);
		}

		let vector = request.vector.as_deref().unwrap_or_default();
		let layout = self.layout().await?;
		let partitions = self
			.partitions(namespace)
			.max(partition::partition_count(vector.len(), layout.dimension));
		let requests: Vec<(usize, String, QueryRequest)> =
			partition::split(vector, layout.dimension, partitions)
				.into_iter()
				.enumerate()
				.filter(|(_, chunk)| !partition::is_zero(chunk))
				.map(|(index, chunk)| {
					(index, partition::backing_namespace(namespace, index), QueryRequest {
						vector: Some(chunk),
						data: None,
						..request.clone()
					})
				})
				.collect();

		if requests.is_empty() {
			return Ok(Vec::new());
		}

		let results = future::join_all(requests.iter().map(|(index, backing, request)| async move {
			self.shared.store.query(backing, request.clone()).await.map(|hits| (*index, hits))
		}))
		.await;
		let partials = settle("query", results)?;

		Ok(merge::merge_scored(layout.similarity, layout.dimension, partials, request.top_k))
	}

	pub async fn fetch(
		&self,
		namespace: &str,
		ids: &[String],
		options: FetchOptions,
	) -> Result<Vec<Option<Record>>> {
		let (layout, partitions) = self.spanned(namespace).await?;

		if partitions == 1 {
			return Ok(self.shared.store.fetch(namespace, ids, options).await?);
		}

		let partials = self.fetch_partitions(namespace, 0..partitions, ids, options).await?;

		Ok(merge::merge_records(layout.dimension, ids.len(), partials))
	}

	async fn fetch_partitions(
		&self,
		namespace: &str,
		partitions: std::ops::Range<usize>,
		ids: &[String],
		options: FetchOptions,
	) -> Result<Vec<(usize, Vec<Option<Record>>)>> {
		let backing: Vec<(usize, String)> = partitions
			.map(|index| (index, partition::backing_namespace(namespace, index)))
			.collect();
		let results = future::join_all(backing.iter().map(|(index, backing)| async move {
			self.shared.store.fetch(backing, ids, options).await.map(|records| (*index, records))
		}))
		.await;

		settle("fetch", results)
	}

	/// Returns how many of `ids` existed.
	pub async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
		let (_, partitions) = self.spanned(namespace).await?;
		let backing: Vec<String> = (0..partitions)
			.map(|index| partition::backing_namespace(namespace, index))
			.collect();
		let results =
			future::join_all(backing.iter().map(|backing| self.shared.store.delete(backing, ids)))
				.await;

		Ok(settle("delete", results)?.into_iter().max().unwrap_or(0))
	}

	/// Returns whether the id existed.
	pub async fn update(&self, namespace: &str, request: UpdateRequest) -> Result<bool> {
		let (layout, partitions) = self.spanned(namespace).await?;
		let Some(vector) = request.vector.clone() else {
			let backing: Vec<String> = (0..partitions)
				.map(|index| partition::backing_namespace(namespace, index))
				.collect();
			let results = future::join_all(
				backing.iter().map(|backing| self.shared.store.update(backing, request.clone())),
			)
			.await;

			return Ok(settle("update", results)?.first().copied().unwrap_or(false));
		};
		let needed = partition::partition_count(vector.len(), layout.dimension);
		let partitions = self.widen(namespace, partitions.max(needed));
		let mut chunks = partition::split(&vector, layout.dimension, partitions).into_iter();
		let base = UpdateRequest { vector: chunks.next(), ..request.clone() };

		if !self.shared.store.update(namespace, base).await? {
			return Ok(false);
		}

		let results = future::join_all(chunks.enumerate().map(|(offset, chunk)| {
			let backing = partition::backing_namespace(namespace, offset + 1);
			let request = request.clone();

			async move {
				let updated = self
					.shared
					.store
					.update(&backing, UpdateRequest { vector: Some(chunk.clone()), ..request.clone() })
					.await?;

				// Partitions the record never reached get a fresh chunk.
				if !updated {
					let record = Record::with_vector(request.id, chunk).metadata(request.metadata);

					self.shared.store.upsert(&backing, vec![record]).await?;
				}

				Ok::<_, tessera_storage::Error>(())
			}
		}))
		.await;

		settle("update", results)?;

		Ok(true)
	}

	/// Pages through partition zero and completes each page from the other partitions.
	pub async fn range(&self, namespace: &str, request: RangeRequest) -> Result<RangePage> {
		let (layout, partitions) = self.spanned(namespace).await?;
		let include_vectors = request.include_vectors;
		let include_metadata = request.include_metadata;
		let page = self.shared.store.range(namespace, request).await?;

		if partitions == 1 || !include_vectors || page.items.is_empty() {
			return Ok(page);
		}

		let ids: Vec<String> = page.items.iter().map(|record| record.id.clone()).collect();
		let options = FetchOptions { include_vectors, include_metadata, include_data: false };
		let mut partials = self.fetch_partitions(namespace, 1..partitions, &ids, options).await?;

		partials.push((0, page.items.into_iter().map(Some).collect()));

		Ok(RangePage {
			items: merge::merge_records(layout.dimension, ids.len(), partials)
				.into_iter()
				.flatten()
				.collect(),
			next_cursor: page.next_cursor,
		})
	}

	pub async fn reset(&self, namespace: &str) -> Result<()> {
		let (_, partitions) = self.spanned(namespace).await?;
		let backing: Vec<String> = (0..partitions)
			.map(|index| partition::backing_namespace(namespace, index))
			.collect();
		let results =
			future::join_all(backing.iter().map(|backing| self.shared.store.reset(backing))).await;

		settle("reset", results)?;

		Ok(())
	}

	pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
		let (_, partitions) = self.spanned(namespace).await?;
		let backing: Vec<String> = (0..partitions)
			.map(|index| partition::backing_namespace(namespace, index))
			.collect();
		let results = future::join_all(
			backing.iter().map(|backing| self.shared.store.delete_namespace(backing)),
		)
		.await;

		settle("delete_namespace", results)?;
		self.lock_partitions().remove(namespace);

		Ok(())
	}

	/// Store info with partition namespaces folded into their logical namespace.
	///
	/// Partitions seen in the store also widen the local partition map.
	pub async fn info(&self) -> Result<IndexInfo> {
		let info = self.shared.store.info().await?;
		let mut namespaces = BTreeMap::new();
		let mut spans: BTreeMap<String, usize> = BTreeMap::new();

		for (backing, count) in info.namespaces {
			let (namespace, index) = partition::parse_backing_namespace(&backing);
			let entry = namespaces.entry(namespace.to_string()).or_insert(0);
			let span = spans.entry(namespace.to_string()).or_insert(1);

			*span = (*span).max(index + 1);

			if index == 0 {
				*entry = count;
			}
		}
		for (namespace, span) in spans {
			self.widen(&namespace, span);
		}

		Ok(IndexInfo { dimension: info.dimension, similarity: info.similarity, namespaces })
	}

	pub async fn list_namespaces(&self) -> Result<Vec<String>> {
		let namespaces: BTreeSet<String> = self
			.shared
			.store
			.list_namespaces()
			.await?
			.iter()
			.map(|backing| partition::parse_backing_namespace(backing).0.to_string())
			.collect();

		Ok(namespaces.into_iter().collect())
	}
}

/// Collects fan-out results; any failure fails the whole call.
fn settle<T>(
	operation: &'static str,
	results: Vec<tessera_storage::Result<T>>,
) -> Result<Vec<T>> {
	let total = results.len();
	let mut values = Vec::with_capacity(total);
	let mut errors = Vec::new();

	for result in results {
		match result {
			Ok(value) => values.push(value),
			Err(err) => errors.push(err),
		}
	}

	if errors.is_empty() {
		return Ok(values);
	}
	if total == 1 {
		return Err(Error::Storage(errors.remove(0)));
	}

	let failed = errors.len();
	let message = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");

	tracing::warn!(operation, failed, total, "Partition fan-out failed.");

	Err(Error::PartialFailure { operation, failed, total, message })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settle_reports_partial_failures() {
		let results: Vec<tessera_storage::Result<usize>> = vec![
			Ok(1),
			Err(tessera_storage::Error::NotFound("notes.1.shard".to_string())),
			Ok(1),
		];
		let err = settle("delete", results).expect_err("Expected a partial failure.");

		assert!(matches!(err, Error::PartialFailure { operation: "delete", failed: 1, total: 3, .. }));
	}

	#[test]
	fn settle_passes_single_errors_through() {
		let results: Vec<tessera_storage::Result<()>> =
			vec![Err(tessera_storage::Error::InvalidArgument("bad".to_string()))];

		assert!(matches!(settle("upsert", results), Err(Error::Storage(_))));
		assert_eq!(settle("upsert", vec![Ok::<_, tessera_storage::Error>(2)]).ok(), Some(vec![2]));
	}
}
