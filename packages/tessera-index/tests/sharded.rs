use std::sync::Arc;

use serde_json::json;

use tessera_domain::{Record, Similarity};
use tessera_index::{Error, ScopedIndex, ShardedIndex};
use tessera_storage::{
	FetchOptions, QueryRequest, RangeRequest, UpdateRequest, VectorStore,
	memory::MemoryVectorStore,
};

fn narrow_store() -> Arc<MemoryVectorStore> {
	Arc::new(MemoryVectorStore::new(3, Similarity::DotProduct))
}

fn ids(ids: &[&str]) -> Vec<String> {
	ids.iter().map(|id| id.to_string()).collect()
}

async fn seeded(store: Arc<MemoryVectorStore>) -> ShardedIndex {
	let index = ShardedIndex::new(store, true);

	index
		.upsert("ns", vec![
			Record::with_vector("a", vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0])
				.metadata(json!({ "kind": "a" }).as_object().cloned()),
			Record::with_vector("b", vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
		])
		.await
		.expect("Failed to upsert wide vectors.");

	index
}

#[tokio::test]
async fn wide_vectors_span_partitions_and_reassemble() {
	let store = narrow_store();
	let index = seeded(store.clone()).await;

	assert_eq!(index.partitions("ns"), 2);
	assert_eq!(
		store.list_namespaces().await.expect("Failed to list namespaces."),
		vec!["ns".to_string(), "ns.1.shard".to_string()]
	);

	let fetched = index
		.fetch("ns", &ids(&["a", "b", "missing"]), FetchOptions::everything())
		.await
		.expect("Failed to fetch.");

	assert_eq!(
		fetched[0].as_ref().and_then(|record| record.vector.clone()),
		Some(vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0])
	);
	assert_eq!(
		fetched[0].as_ref().and_then(|record| record.metadata.clone()),
		json!({ "kind": "a" }).as_object().cloned()
	);
	assert_eq!(
		fetched[1].as_ref().and_then(|record| record.vector.clone()),
		Some(vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0])
	);
	assert!(fetched[2].is_none());
}

#[tokio::test]
async fn queries_recombine_partition_scores() {
	let index = seeded(narrow_store()).await;
	let hits = index
		.query("ns", QueryRequest::by_vector(vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0], 10))
		.await
		.expect("Failed to query.");

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].id, "a");
	// Dot products 3 and 1, normalized as (1 + s) / 2.
	assert!((hits[0].score - 2.0).abs() < 1e-9);
	assert!((hits[1].score - 1.0).abs() < 1e-9);
}

async fn split_pair(similarity: Similarity) -> ShardedIndex {
	let index = ShardedIndex::new(Arc::new(MemoryVectorStore::new(3, similarity)), true);

	index
		.upsert("ns", vec![
			Record::with_vector("a", vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]),
			Record::with_vector("b", vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
		])
		.await
		.expect("Failed to upsert wide vectors.");

	index
}

#[tokio::test]
async fn euclidean_scores_add_partition_distances() {
	let index = split_pair(Similarity::Euclidean).await;
	let hits = index
		.query("ns", QueryRequest::by_vector(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 10))
		.await
		.expect("Failed to query.");

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].id, "a");
	// Distances 0 and 1 for "a", sqrt(2) and 1 for "b".
	assert!((hits[0].score - 0.5).abs() < 1e-9);
	assert!((hits[1].score - 1.0 / (2.0 + 2.0_f64.sqrt())).abs() < 1e-9);
}

#[tokio::test]
async fn cosine_scores_add_partition_scores() {
	let index = split_pair(Similarity::Cosine).await;
	let hits = index
		.query("ns", QueryRequest::by_vector(vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 10))
		.await
		.expect("Failed to query.");

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].id, "a");
	assert!((hits[0].score - 2.0).abs() < 1e-9);
	assert!((hits[1].score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn zero_chunks_are_not_queried() {
	let index = seeded(narrow_store()).await;
	let hits = index
		.query("ns", QueryRequest::by_vector(vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0], 1))
		.await
		.expect("Failed to query.");

	assert_eq!(hits.len(), 1);
	assert_eq!(hits[0].id, "a");
	assert!((hits[0].score - 1.5).abs() < 1e-9);

	let empty = index
		.query("ns", QueryRequest::by_vector(vec![0.0; 6], 10))
		.await
		.expect("Failed to query with a zero vector.");

	assert!(empty.is_empty());
}

#[tokio::test]
async fn partition_count_never_shrinks() {
	let index = seeded(narrow_store()).await;

	index
		.upsert("ns", vec![Record::with_vector("c", vec![1.0, 1.0, 1.0])])
		.await
		.expect("Failed to upsert a narrow vector.");

	assert_eq!(index.partitions("ns"), 2);

	let fetched = index
		.fetch("ns", &ids(&["c"]), FetchOptions::everything())
		.await
		.expect("Failed to fetch.");

	assert_eq!(
		fetched[0].as_ref().and_then(|record| record.vector.clone()),
		Some(vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0])
	);
}

#[tokio::test]
async fn updates_and_deletes_fan_out() {
	let index = seeded(narrow_store()).await;
	let updated = index
		.update("ns", UpdateRequest {
			id: "b".to_string(),
			vector: Some(vec![0.0, 0.0, 0.0, 0.0, 0.0, 7.0]),
			metadata: json!({ "kind": "b" }).as_object().cloned(),
		})
		.await
		.expect("Failed to update.");

	assert!(updated);

	let fetched = index
		.fetch("ns", &ids(&["b"]), FetchOptions::everything())
		.await
		.expect("Failed to fetch.");

	assert_eq!(
		fetched[0].as_ref().and_then(|record| record.vector.clone()),
		Some(vec![0.0, 0.0, 0.0, 0.0, 0.0, 7.0])
	);

	let missing = index
		.update("ns", UpdateRequest { id: "zzz".to_string(), ..Default::default() })
		.await
		.expect("Failed to update a missing id.");

	assert!(!missing);
	assert_eq!(index.delete("ns", &ids(&["a", "zzz"])).await.expect("Failed to delete."), 1);
}

#[tokio::test]
async fn range_pages_carry_full_vectors() {
	let index = seeded(narrow_store()).await;
	let page = index
		.range("ns", RangeRequest {
			limit: 1,
			include_vectors: true,
			include_metadata: true,
			..Default::default()
		})
		.await
		.expect("Failed to range.");

	assert_eq!(page.items.len(), 1);
	assert_eq!(page.items[0].vector, Some(vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]));
	assert_eq!(page.next_cursor.as_deref(), Some("b"));
}

#[tokio::test]
async fn info_and_namespaces_hide_partitions() {
	let index = seeded(narrow_store()).await;
	let info = index.info().await.expect("Failed to read info.");

	assert_eq!(info.dimension, 3);
	assert_eq!(info.namespaces.get("ns"), Some(&2));
	assert_eq!(info.namespaces.len(), 1);
	assert_eq!(index.list_namespaces().await.expect("Failed to list."), vec!["ns".to_string()]);

	index.delete_namespace("ns").await.expect("Failed to delete namespace.");

	assert!(index.list_namespaces().await.expect("Failed to list.").is_empty());
	assert_eq!(index.partitions("ns"), 1);
}

#[tokio::test]
async fn discovery_picks_up_existing_partitions() {
	let store = narrow_store();

	store
		.upsert("ns.2.shard", vec![Record::with_vector("a", vec![0.0, 0.0, 1.0])])
		.await
		.expect("Failed to seed a partition.");

	let index = ShardedIndex::new(store, true);

	index.layout().await.expect("Failed to discover layout.");

	assert!(index.is_ready());
	assert_eq!(index.partitions("ns"), 3);
}

#[tokio::test]
async fn reopened_index_reaches_every_partition() {
	let store = narrow_store();

	seeded(store.clone()).await;

	let reopened = ShardedIndex::new(store.clone(), true);
	let fetched = reopened
		.fetch("ns", &ids(&["a"]), FetchOptions::everything())
		.await
		.expect("Failed to fetch.");

	assert_eq!(
		fetched[0].as_ref().and_then(|record| record.vector.clone()),
		Some(vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0])
	);
	assert_eq!(reopened.delete("ns", &ids(&["a"])).await.expect("Failed to delete."), 1);
	assert!(
		store
			.fetch("ns.1.shard", &ids(&["a"]), FetchOptions::everything())
			.await
			.expect("Failed to fetch a partition.")[0]
			.is_none()
	);

	ShardedIndex::new(store.clone(), true)
		.delete_namespace("ns")
		.await
		.expect("Failed to delete namespace.");

	assert!(store.list_namespaces().await.expect("Failed to list namespaces.").is_empty());
}

#[tokio::test]
async fn info_widens_the_partition_map() {
	let store = narrow_store();
	let index = ShardedIndex::new(store.clone(), true);

	index.layout().await.expect("Failed to discover layout.");
	store
		.upsert("late.1.shard", vec![Record::with_vector("a", vec![0.0, 1.0, 0.0])])
		.await
		.expect("Failed to seed a partition.");

	assert_eq!(index.partitions("late"), 1);

	index.info().await.expect("Failed to read info.");

	assert_eq!(index.partitions("late"), 2);
}

#[test]
fn calls_before_discovery_fail_when_not_waiting() {
	// Built outside a runtime, so no background discovery is started.
	let index = ShardedIndex::new(narrow_store(), false);
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.expect("Failed to build runtime.");
	let result = runtime.block_on(index.upsert("ns", vec![Record::with_vector("a", vec![1.0])]));

	assert!(matches!(result, Err(Error::NotReady)));

	let fetched = runtime.block_on(index.fetch("ns", &ids(&["a"]), FetchOptions::everything()));
	let deleted = runtime.block_on(index.delete("ns", &ids(&["a"])));
	let updated = runtime.block_on(index.update("ns", UpdateRequest {
		id: "a".to_string(),
		..Default::default()
	}));
	let ranged = runtime.block_on(index.range("ns", RangeRequest::default()));
	let reset = runtime.block_on(index.reset("ns"));
	let dropped = runtime.block_on(index.delete_namespace("ns"));

	assert!(matches!(fetched, Err(Error::NotReady)));
	assert!(matches!(deleted, Err(Error::NotReady)));
	assert!(matches!(updated, Err(Error::NotReady)));
	assert!(matches!(ranged, Err(Error::NotReady)));
	assert!(matches!(reset, Err(Error::NotReady)));
	assert!(matches!(dropped, Err(Error::NotReady)));
	assert!(!index.is_ready());
}

#[tokio::test]
async fn scopes_keep_methods_apart() {
	let index = Arc::new(ShardedIndex::new(narrow_store(), true));
	let bm25 = ScopedIndex::new(index.clone(), "bm25");
	let semantic = ScopedIndex::new(index, "semantic");

	bm25.upsert("notes", vec![Record::with_vector("a", vec![1.0, 0.0, 0.0, 1.0])])
		.await
		.expect("Failed to upsert bm25 vector.");
	semantic
		.upsert("", vec![Record::with_vector("a", vec![0.0, 1.0, 0.0])])
		.await
		.expect("Failed to upsert semantic vector.");

	assert_eq!(bm25.list_namespaces().await.expect("list"), vec!["notes".to_string()]);
	assert_eq!(semantic.list_namespaces().await.expect("list"), vec![String::new()]);
	assert_eq!(bm25.info().await.expect("info").namespaces.get("notes"), Some(&1));
	assert!(
		semantic
			.fetch("notes", &ids(&["a"]), FetchOptions::everything())
			.await
			.expect("fetch")[0]
			.is_none()
	);
}
