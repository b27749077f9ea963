use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::Result;

const SCHEMA: &str = include_str!("../../../sql/init.sql");
const SCHEMA_LOCK_ID: i64 = 7_305_112;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &tessera_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		// Advisory locks are held per connection; the transaction scopes the lock to one.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(SCHEMA_LOCK_ID).execute(&mut *tx).await?;

		for statement in SCHEMA.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
