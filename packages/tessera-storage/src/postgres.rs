use std::collections::HashSet;

use serde_json::Value;
use sqlx::PgConnection;

use crate::{
	BoxFuture, Result,
	db::Db,
	metadata::{self, Command, MetadataStore, Reply, Script},
};

impl MetadataStore for Db {
	fn pipeline<'a>(&'a self, commands: Vec<Command>) -> BoxFuture<'a, Result<Vec<Reply>>> {
		Box::pin(async move {
			let mut tx = self.pool.begin().await?;
			let mut replies = Vec::with_capacity(commands.len());

			for command in commands {
				replies.push(apply(&mut *tx, command).await?);
			}

			tx.commit().await?;

			Ok(replies)
		})
	}
}

async fn apply(conn: &mut PgConnection, command: Command) -> Result<Reply> {
	match command {
		Command::JsonGet { key, path } => {
			let doc: Option<Value> =
				sqlx::query_scalar("SELECT value FROM tessera_kv WHERE key = $1")
					.bind(key.as_str())
					.fetch_optional(&mut *conn)
					.await?;

			Ok(Reply::Json(metadata::json_get(doc.as_ref(), &path)))
		},
		Command::JsonSet { key, path, value } => {
			let mut doc = load_for_update(conn, &key).await?;

			metadata::json_set(&mut doc, &path, value)?;
			store(conn, &key, doc).await?;

			Ok(Reply::Ok)
		},
		Command::JsonIncr { key, path, by } => {
			let mut doc = load_for_update(conn, &key).await?;
			let next = metadata::json_incr(&mut doc, &path, by)?;

			store(conn, &key, doc).await?;

			Ok(Reply::Integer(next))
		},
		Command::JsonArrAppend { key, path, value } => {
			let mut doc = load_for_update(conn, &key).await?;
			let len = metadata::json_arr_append(&mut doc, &path, value)?;

			store(conn, &key, doc).await?;

			Ok(Reply::Integer(len))
		},
		Command::Del { keys } => {
			let json_keys: Vec<String> =
				sqlx::query_scalar("DELETE FROM tessera_kv WHERE key = ANY($1) RETURNING key")
					.bind(keys.as_slice())
					.fetch_all(&mut *conn)
					.await?;
			let set_keys: Vec<String> =
				sqlx::query_scalar("DELETE FROM tessera_sets WHERE key = ANY($1) RETURNING key")
					.bind(keys.as_slice())
					.fetch_all(&mut *conn)
					.await?;
			let removed: HashSet<String> = json_keys.into_iter().chain(set_keys).collect();

			Ok(Reply::Integer(removed.len() as i64))
		},
		Command::SetAdd { key, members } => {
			let added = sqlx::query(
				"\
INSERT INTO tessera_sets (key, member)
SELECT $1, unnest($2::text[])
ON CONFLICT DO NOTHING",
			)
			.bind(key.as_str())
			.bind(members.as_slice())
			.execute(&mut *conn)
			.await?
			.rows_affected();

			Ok(Reply::Integer(added as i64))
		},
		Command::SetRemove { key, members } => {
			let removed =
				sqlx::query("DELETE FROM tessera_sets WHERE key = $1 AND member = ANY($2)")
					.bind(key.as_str())
					.bind(members.as_slice())
					.execute(&mut *conn)
					.await?
					.rows_affected();

			Ok(Reply::Integer(removed as i64))
		},
		Command::SetIsMember { key, members } => {
			let present: HashSet<String> = sqlx::query_scalar::<_, String>(
				"SELECT member FROM tessera_sets WHERE key = $1 AND member = ANY($2)",
			)
			.bind(key.as_str())
			.bind(members.as_slice())
			.fetch_all(&mut *conn)
			.await?
			.into_iter()
			.collect();

			Ok(Reply::Bools(members.iter().map(|member| present.contains(member)).collect()))
		},
		Command::SetMembers { key } => {
			let members: Vec<String> =
				sqlx::query_scalar("SELECT member FROM tessera_sets WHERE key = $1 ORDER BY member")
					.bind(key.as_str())
					.fetch_all(&mut *conn)
					.await?;

			Ok(Reply::Members(members))
		},
		Command::Script(Script::CreateIfAbsent { key, value }) => {
			let created = sqlx::query(
				"INSERT INTO tessera_kv (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
			)
			.bind(key.as_str())
			.bind(value)
			.execute(&mut *conn)
			.await?
			.rows_affected();

			Ok(Reply::Bool(created == 1))
		},
		Command::Script(Script::AssignWordIndex { key, word }) => {
			let mut doc = load_for_update(conn, &key).await?;
			let index = metadata::assign_word_index(&mut doc, &key, &word)?;

			store(conn, &key, doc).await?;

			Ok(Reply::Integer(index))
		},
	}
}

async fn load_for_update(conn: &mut PgConnection, key: &str) -> Result<Option<Value>> {
	let doc = sqlx::query_scalar("SELECT value FROM tessera_kv WHERE key = $1 FOR UPDATE")
		.bind(key)
		.fetch_optional(&mut *conn)
		.await?;

	Ok(doc)
}

async fn store(conn: &mut PgConnection, key: &str, doc: Option<Value>) -> Result<()> {
	let Some(value) = doc else {
		return Ok(());
	};

	sqlx::query(
		"\
INSERT INTO tessera_kv (key, value)
VALUES ($1, $2)
ON CONFLICT (key) DO UPDATE
SET value = EXCLUDED.value, updated_at = now()",
	)
	.bind(key)
	.bind(value)
	.execute(&mut *conn)
	.await?;

	Ok(())
}
