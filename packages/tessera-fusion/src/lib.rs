//! Merging independently ranked result lists into one.
//!
//! Every method sums per-list contributions by id. When an id shows up in several lists its
//! metadata is shallow-merged with later lists winning, and the first vector seen is kept.

mod normalize;
mod rrf;

pub use normalize::{MinMaxNormalization, StandardNormalization};
pub use rrf::Rrf;

use std::{collections::HashMap, fmt, str::FromStr};

use tessera_domain::{ScoredRecord, record};

pub trait Fusion
where
	Self: Send + Sync,
{
	/// Returns the merged list sorted by descending combined score.
	fn fuse(&self, lists: Vec<Vec<ScoredRecord>>) -> Vec<ScoredRecord>;
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown fusion method {0:?}.")]
pub struct UnknownMethod(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FusionMethod {
	Rrf,
	MinMax,
	Standard,
}
impl FusionMethod {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Rrf => "rrf",
			Self::MinMax => "min_max",
			Self::Standard => "standard",
		}
	}
}
impl FromStr for FusionMethod {
	type Err = UnknownMethod;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"rrf" => Ok(Self::Rrf),
			"min_max" => Ok(Self::MinMax),
			"standard" => Ok(Self::Standard),
			other => Err(UnknownMethod(other.to_string())),
		}
	}
}
impl fmt::Display for FusionMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Builds the configured fusion strategy.
pub fn from_config(cfg: &tessera_config::Fusion) -> Result<Box<dyn Fusion>, UnknownMethod> {
	Ok(match cfg.method.parse::<FusionMethod>()? {
		FusionMethod::Rrf => Box::new(Rrf::new(cfg.rrf_k)),
		FusionMethod::MinMax => Box::new(MinMaxNormalization),
		FusionMethod::Standard => Box::new(StandardNormalization),
	})
}

/// Sorts a list by descending score, keeping the input order among ties.
fn ranked(mut list: Vec<ScoredRecord>) -> Vec<ScoredRecord> {
	list.sort_by(|a, b| tessera_domain::cmp_score_desc(a.score, b.score));

	list
}

#[derive(Default)]
struct Accumulator {
	order: Vec<String>,
	merged: HashMap<String, ScoredRecord>,
}
impl Accumulator {
	fn add(&mut self, hit: ScoredRecord, contribution: f64) {
		match self.merged.get_mut(&hit.id) {
			Some(existing) => {
				existing.score += contribution;
				existing.metadata = record::merge_metadata(existing.metadata.take(), hit.metadata);

				if existing.vector.is_none() {
					existing.vector = hit.vector;
				}
				if existing.data.is_none() {
					existing.data = hit.data;
				}
			},
			None => {
				self.order.push(hit.id.clone());
				self.merged.insert(hit.id.clone(), ScoredRecord { score: contribution, ..hit });
			},
		}
	}

	fn finish(mut self) -> Vec<ScoredRecord> {
		let mut out: Vec<ScoredRecord> =
			self.order.iter().filter_map(|id| self.merged.remove(id)).collect();

		out.sort_by(|a, b| tessera_domain::cmp_score_desc(a.score, b.score));

		out
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_methods() {
		assert_eq!("min_max".parse::<FusionMethod>().ok(), Some(FusionMethod::MinMax));
		assert!("borda".parse::<FusionMethod>().is_err());
		assert_eq!(FusionMethod::Standard.to_string(), "standard");
	}

	#[test]
	fn collisions_merge_metadata_and_keep_first_vector() {
		let mut acc = Accumulator::default();

		acc.add(
			ScoredRecord {
				vector: Some(vec![1.0]),
				metadata: json!({ "a": 1, "b": 1 }).as_object().cloned(),
				..ScoredRecord::new("x", 0.0)
			},
			1.0,
		);
		acc.add(
			ScoredRecord {
				vector: Some(vec![2.0]),
				metadata: json!({ "b": 2 }).as_object().cloned(),
				..ScoredRecord::new("x", 0.0)
			},
			0.5,
		);

		let merged = acc.finish();

		assert_eq!(merged.len(), 1);
		assert_eq!(merged[0].score, 1.5);
		assert_eq!(merged[0].vector, Some(vec![1.0]));
		assert_eq!(merged[0].metadata, json!({ "a": 1, "b": 2 }).as_object().cloned());
	}

	#[test]
	fn builds_from_config() {
		let cfg = tessera_config::Fusion { method: "rrf".to_string(), rrf_k: 10.0 };
		let fused = from_config(&cfg).expect("Failed to build fusion.").fuse(vec![vec![
			ScoredRecord::new("a", 1.0),
		]]);

		assert_eq!(fused[0].score, 1.0 / 10.0);
	}
}
