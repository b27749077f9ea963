mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, str::FromStr, sync::Mutex, thread};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use tessera_domain::Document;

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// Six short documents with known statistics: 15 tokens, 9 distinct words, and `world` in three
/// documents.
pub fn sample_corpus() -> Vec<Document> {
	[
		("1", "Hello world"),
		("2", "Hello world"),
		("3", "lorem ipsum dolor sit amet"),
		("4", "lorem ipsum world"),
		("5", "Foo bar"),
		("6", "Bar"),
	]
	.into_iter()
	.map(|(id, text)| Document::new(id, text))
	.collect()
}

pub fn env_dsn() -> Option<String> {
	env::var("TESSERA_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("TESSERA_QDRANT_URL").ok()
}

/// A throwaway Postgres database plus the Qdrant collection prefixes handed out for it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	prefixes: Mutex<HashSet<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse TESSERA_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("tessera_test_{}", Uuid::new_v4().simple());

		admin_conn
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false, prefixes: Mutex::new(HashSet::new()) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// A collection prefix unique to this database; its collections are dropped on cleanup.
	pub fn collection_prefix(&self, prefix: &str) -> String {
		let prefix = format!("{prefix}_{}", self.name);

		self.prefixes.lock().unwrap_or_else(|err| err.into_inner()).insert(prefix.clone());

		prefix
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		let prefixes = self.tracked_prefixes();
		let qdrant_result = cleanup_qdrant(&prefixes).await;

		cleanup_database(&self.name, &self.admin_options).await?;
		qdrant_result?;

		self.cleaned = true;

		Ok(())
	}

	fn tracked_prefixes(&self) -> Vec<String> {
		self.prefixes.lock().unwrap_or_else(|err| err.into_inner()).iter().cloned().collect()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let prefixes = self.tracked_prefixes();
		// Drop may run inside a runtime, so cleanup gets its own thread and runtime.
		let handle = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test cleanup failed to start a runtime: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_qdrant(&prefixes)) {
				eprintln!("Test Qdrant cleanup failed: {err}.");
			}
			if let Err(err) = runtime.block_on(cleanup_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = handle.join();
	}
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn cleanup_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}

/// Drops every collection a tracked prefix owns. Stragglers are reported, not retried.
async fn cleanup_qdrant(prefixes: &[String]) -> Result<()> {
	if prefixes.is_empty() {
		return Ok(());
	}

	let Some(url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set TESSERA_QDRANT_URL to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&url).build()?;
	let collections = client.list_collections().await?.collections;
	let owned = collections
		.into_iter()
		.map(|collection| collection.name)
		.filter(|name| prefixes.iter().any(|prefix| owns(prefix, name)));
	let mut failures = Vec::new();

	for collection in owned {
		if let Err(err) = client.delete_collection(collection.clone()).await {
			failures.push(format!("{collection}: {err}"));
		}
	}

	if failures.is_empty() {
		Ok(())
	} else {
		Err(Error::Message(format!("Failed to delete test collections: {}.", failures.join(", "))))
	}
}

fn owns(prefix: &str, collection: &str) -> bool {
	collection == prefix
		|| collection.strip_prefix(prefix).map(|rest| rest.starts_with('-')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prefixes_own_their_namespace_collections() {
		assert!(owns("t_db", "t_db"));
		assert!(owns("t_db", "t_db-notes.bm25"));
		assert!(!owns("t_db", "t_db2"));
	}

	#[test]
	fn sample_corpus_has_six_documents() {
		let corpus = sample_corpus();

		assert_eq!(corpus.len(), 6);
		assert_eq!(corpus[3].text, "lorem ipsum world");
	}
}
