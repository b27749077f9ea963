pub mod method;
pub mod semantic;
pub mod service;

mod error;

pub use error::{Error, Result};
pub use method::SearchMethod;
pub use semantic::{SemanticMethod, SemanticMode};
pub use service::{BM25_SCOPE, QueryResponse, SEMANTIC_SCOPE, Target, TesseraService};

use std::{future::Future, pin::Pin};

use tessera_config::EmbeddingProviderConfig;
use tessera_providers::embedding;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, tessera_providers::Result<Vec<Vec<f32>>>>;
}

/// Embeds over HTTP with the configured OpenAI-compatible endpoint.
pub struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, tessera_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
