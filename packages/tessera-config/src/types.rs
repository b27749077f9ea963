use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub sharding: Sharding,
	#[serde(default)]
	pub bm25: Bm25,
	pub semantic: Semantic,
	pub providers: Providers,
	#[serde(default)]
	pub fusion: Fusion,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	/// Backing namespace `n` lives in collection `{collection_prefix}-{n}`.
	pub collection_prefix: String,
	/// Fixed width of every stored vector. Wider vectors are partitioned.
	pub vector_dim: u32,
	/// One of cosine, euclid, or dot.
	pub distance: String,
	/// Optional. Model used for server-side inference of payload-only records.
	pub inference_model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Sharding {
	/// Operations issued before the store layout is known wait for it instead of failing.
	pub wait_for_ready: bool,
}
impl Default for Sharding {
	fn default() -> Self {
		Self { wait_for_ready: true }
	}
}

#[derive(Debug, Deserialize)]
pub struct Bm25 {
	#[serde(default = "default_bm25_k")]
	pub k: f64,
	#[serde(default = "default_bm25_b")]
	pub b: f64,
	#[serde(default = "default_rebuild_document_ratio")]
	pub rebuild_document_ratio: f64,
	#[serde(default = "default_rebuild_length_drift")]
	pub rebuild_length_drift: f64,
}
impl Default for Bm25 {
	fn default() -> Self {
		Self {
			k: default_bm25_k(),
			b: default_bm25_b(),
			rebuild_document_ratio: default_rebuild_document_ratio(),
			rebuild_length_drift: default_rebuild_length_drift(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Semantic {
	/// Either provider (embed locally, store vectors) or server (store raw text).
	pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Fusion {
	/// One of rrf, min_max, or standard.
	pub method: String,
	#[serde(default = "default_rrf_k")]
	pub rrf_k: f64,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { method: "rrf".to_string(), rrf_k: default_rrf_k() }
	}
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub top_k: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { top_k: 10 }
	}
}

fn default_bm25_k() -> f64 {
	1.5
}

fn default_bm25_b() -> f64 {
	0.75
}

fn default_rebuild_document_ratio() -> f64 {
	2.0
}

fn default_rebuild_length_drift() -> f64 {
	0.1
}

fn default_rrf_k() -> f64 {
	60.0
}
