use serde_json::json;

use tessera_config::{Postgres, Qdrant};
use tessera_domain::{NamespaceStatistics, Record, Similarity};
use tessera_storage::{
	Command, FetchOptions, MetadataStore, QueryRequest, RangeRequest, Reply, Script,
	UpdateRequest, VectorStore, db::Db, memory::MemoryMetadataStore, memory::MemoryVectorStore,
	qdrant::QdrantStore,
};
use tessera_testkit::TestDatabase;

async fn exercise_metadata_store(store: &dyn MetadataStore) {
	let stats = serde_json::to_value(NamespaceStatistics::default()).expect("stats");
	let replies = store
		.pipeline(vec![
			Command::Script(Script::CreateIfAbsent { key: "stats".to_string(), value: stats.clone() }),
			Command::Script(Script::CreateIfAbsent { key: "stats".to_string(), value: stats }),
			Command::Script(Script::AssignWordIndex {
				key: "stats".to_string(),
				word: "hello".to_string(),
			}),
			Command::Script(Script::AssignWordIndex {
				key: "stats".to_string(),
				word: "world".to_string(),
			}),
			Command::Script(Script::AssignWordIndex {
				key: "stats".to_string(),
				word: "hello".to_string(),
			}),
			Command::json_incr(
				"stats",
				&["word_statistics", "hello", "documents_containing_word"],
				2,
			),
			Command::json_get("stats", &["number_of_words"]),
		])
		.await
		.expect("Failed to run pipeline.");

	assert_eq!(replies, vec![
		Reply::Bool(true),
		Reply::Bool(false),
		Reply::Integer(0),
		Reply::Integer(1),
		Reply::Integer(0),
		Reply::Integer(2),
		Reply::Json(Some(json!(2))),
	]);

	let added = store
		.execute(Command::SetAdd {
			key: "members".to_string(),
			members: vec!["a".to_string(), "b".to_string(), "a".to_string()],
		})
		.await
		.expect("Failed to add members.")
		.into_integer()
		.expect("integer reply");

	assert_eq!(added, 2);

	let flags = store
		.execute(Command::SetIsMember {
			key: "members".to_string(),
			members: vec!["b".to_string(), "c".to_string()],
		})
		.await
		.expect("Failed to check membership.")
		.into_bools()
		.expect("bools reply");

	assert_eq!(flags, vec![true, false]);

	let removed = store
		.execute(Command::Del { keys: vec!["stats".to_string(), "members".to_string()] })
		.await
		.expect("Failed to delete keys.")
		.into_integer()
		.expect("integer reply");

	assert_eq!(removed, 2);

	let members = store
		.execute(Command::SetMembers { key: "members".to_string() })
		.await
		.expect("Failed to list members.")
		.into_members()
		.expect("members reply");

	assert!(members.is_empty());
}

async fn exercise_vector_store(store: &dyn VectorStore, namespace: &str) {
	store
		.upsert(namespace, vec![
			Record::with_vector("a", vec![1.0, 0.0, 0.0]),
			Record::with_vector("b", vec![0.0, 1.0, 0.0])
				.metadata(json!({ "kind": "b" }).as_object().cloned()),
		])
		.await
		.expect("Failed to upsert.");

	let hits = store
		.query(namespace, QueryRequest::by_vector(vec![0.0, 1.0, 0.0], 2))
		.await
		.expect("Failed to query.");

	assert_eq!(hits.first().map(|hit| hit.id.as_str()), Some("b"));

	let updated = store
		.update(namespace, UpdateRequest {
			id: "a".to_string(),
			vector: None,
			metadata: json!({ "kind": "a" }).as_object().cloned(),
		})
		.await
		.expect("Failed to update.");

	assert!(updated);

	let fetched = store
		.fetch(namespace, &["a".to_string(), "zzz".to_string()], FetchOptions::everything())
		.await
		.expect("Failed to fetch.");

	assert_eq!(fetched[0].as_ref().and_then(|r| r.vector.clone()), Some(vec![1.0, 0.0, 0.0]));
	assert_eq!(
		fetched[0].as_ref().and_then(|r| r.metadata.clone()),
		json!({ "kind": "a" }).as_object().cloned()
	);
	assert!(fetched[1].is_none());

	let page = store
		.range(namespace, RangeRequest { limit: 10, ..Default::default() })
		.await
		.expect("Failed to range.");

	assert_eq!(page.items.len(), 2);

	let deleted = store
		.delete(namespace, &["a".to_string(), "zzz".to_string()])
		.await
		.expect("Failed to delete.");

	assert_eq!(deleted, 1);
	assert!(store.list_namespaces().await.expect("list").contains(&namespace.to_string()));

	store.delete_namespace(namespace).await.expect("Failed to delete namespace.");

	assert!(!store.list_namespaces().await.expect("list").contains(&namespace.to_string()));
}

#[tokio::test]
async fn memory_metadata_store_behaves() {
	exercise_metadata_store(&MemoryMetadataStore::new()).await;
}

#[tokio::test]
async fn memory_vector_store_behaves() {
	exercise_vector_store(&MemoryVectorStore::new(3, Similarity::Cosine), "notes").await;
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set TESSERA_PG_DSN to run."]
async fn postgres_metadata_store_behaves() {
	let Some(base_dsn) = tessera_testkit::env_dsn() else {
		eprintln!("Skipping postgres_metadata_store_behaves; set TESSERA_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 })
		.await
		.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	db.ensure_schema().await.expect("Schema bootstrap must be repeatable.");

	exercise_metadata_store(&db).await;

	db.pool.close().await;
	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set TESSERA_PG_DSN and TESSERA_QDRANT_URL to run."]
async fn qdrant_vector_store_behaves() {
	let (Some(base_dsn), Some(url)) = (tessera_testkit::env_dsn(), tessera_testkit::env_qdrant_url())
	else {
		eprintln!("Skipping qdrant_vector_store_behaves; set TESSERA_PG_DSN and TESSERA_QDRANT_URL.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let store = QdrantStore::new(&Qdrant {
		url,
		collection_prefix: test_db.collection_prefix("tessera"),
		vector_dim: 3,
		distance: "cosine".to_string(),
		inference_model: None,
	})
	.expect("Failed to build Qdrant client.");

	exercise_vector_store(&store, "notes").await;

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
