mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Bm25, Config, EmbeddingProviderConfig, Fusion, Postgres, Providers, Qdrant, Search, Semantic,
	Service, Sharding, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection_prefix.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must be non-empty.".to_string(),
		});
	}
	if !matches!(cfg.storage.qdrant.distance.as_str(), "cosine" | "euclid" | "dot") {
		return Err(Error::Validation {
			message: "storage.qdrant.distance must be one of cosine, euclid, or dot.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if !cfg.bm25.k.is_finite() || !cfg.bm25.b.is_finite() {
		return Err(Error::Validation {
			message: "bm25.k and bm25.b must be finite numbers.".to_string(),
		});
	}
	if cfg.bm25.k < 0.0 {
		return Err(Error::Validation { message: "bm25.k must be zero or greater.".to_string() });
	}
	if !(0.0..=1.0).contains(&cfg.bm25.b) {
		return Err(Error::Validation {
			message: "bm25.b must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !cfg.bm25.rebuild_document_ratio.is_finite() || cfg.bm25.rebuild_document_ratio <= 1.0 {
		return Err(Error::Validation {
			message: "bm25.rebuild_document_ratio must be a finite number greater than 1.0."
				.to_string(),
		});
	}
	if !cfg.bm25.rebuild_length_drift.is_finite() || cfg.bm25.rebuild_length_drift < 0.0 {
		return Err(Error::Validation {
			message: "bm25.rebuild_length_drift must be a finite number, zero or greater."
				.to_string(),
		});
	}

	match cfg.semantic.mode.as_str() {
		"provider" => {
			if cfg.providers.embedding.api_key.trim().is_empty() {
				return Err(Error::Validation {
					message: "providers.embedding.api_key must be non-empty in provider mode."
						.to_string(),
				});
			}
			if cfg.providers.embedding.dimensions == 0 {
				return Err(Error::Validation {
					message: "providers.embedding.dimensions must be greater than zero."
						.to_string(),
				});
			}
		},
		"server" =>
			if cfg.storage.qdrant.inference_model.is_none() {
				return Err(Error::Validation {
					message: "storage.qdrant.inference_model must be set in server mode."
						.to_string(),
				});
			},
		_ => {
			return Err(Error::Validation {
				message: "semantic.mode must be one of provider or server.".to_string(),
			});
		},
	}

	if !matches!(cfg.fusion.method.as_str(), "rrf" | "min_max" | "standard") {
		return Err(Error::Validation {
			message: "fusion.method must be one of rrf, min_max, or standard.".to_string(),
		});
	}
	if !cfg.fusion.rrf_k.is_finite() || cfg.fusion.rrf_k <= 0.0 {
		return Err(Error::Validation {
			message: "fusion.rrf_k must be a finite number greater than zero.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.storage
		.qdrant
		.inference_model
		.as_deref()
		.map(|model| model.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.storage.qdrant.inference_model = None;
	}

	cfg.storage.qdrant.distance = cfg.storage.qdrant.distance.trim().to_ascii_lowercase();
	cfg.semantic.mode = cfg.semantic.mode.trim().to_ascii_lowercase();
	cfg.fusion.method = cfg.fusion.method.trim().to_ascii_lowercase();
}
