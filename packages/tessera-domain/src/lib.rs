pub mod bm25;
pub mod record;
pub mod similarity;
pub mod stats;
pub mod tokenizer;

pub use bm25::Bm25Params;
pub use record::{Document, DocumentUpdate, Metadata, Record, ScoredRecord, TextQuery};
pub use similarity::Similarity;
pub use stats::{DocumentTerms, IndexStatistics, NamespaceStatistics, RebuildPolicy, WordStatistic};
pub use tokenizer::{AlphanumericTokenizer, Tokenizer};

use std::cmp::Ordering;

/// Descending order for scores; NaN sorts last.
pub fn cmp_score_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
