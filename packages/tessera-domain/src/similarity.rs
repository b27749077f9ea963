use serde::{Deserialize, Serialize};

/// Normalized score of a vector with zero similarity under cosine and dot product.
pub const NO_MATCH_SCORE: f64 = 0.5;

/// Similarity metric of a vector store.
///
/// Stores report normalized scores: cosine and dot product are mapped to `(1 + s) / 2`,
/// euclidean distance `d` to `1 / (1 + d)`. Partition score recombination relies on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Similarity {
	Cosine,
	Euclidean,
	DotProduct,
}
impl Similarity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Cosine => "COSINE",
			Self::Euclidean => "EUCLIDEAN",
			Self::DotProduct => "DOT_PRODUCT",
		}
	}

	/// Maps a raw similarity (or distance, for euclidean) to the normalized store score.
	pub fn normalize(self, raw: f64) -> f64 {
		match self {
			Self::Cosine | Self::DotProduct => (1.0 + raw) / 2.0,
			Self::Euclidean => 1.0 / (1.0 + raw),
		}
	}

	/// Combines the normalized scores two partitions reported for the same id.
	///
	/// The cosine rule is an approximation: partitions are not renormalized after concatenation.
	pub fn combine(self, a: f64, b: f64) -> f64 {
		match self {
			Self::Cosine => a + b,
			Self::Euclidean => {
				// Sum of the two distances, mapped back through 1 / (1 + d).
				let denom = a + b - a * b;

				if denom == 0.0 { 0.0 } else { a * b / denom }
			},
			Self::DotProduct => a + b - NO_MATCH_SCORE,
		}
	}

	/// Score a zero-similarity hit carries, when the metric has one.
	pub fn no_match_score(self) -> Option<f64> {
		match self {
			Self::Cosine | Self::DotProduct => Some(NO_MATCH_SCORE),
			Self::Euclidean => None,
		}
	}

	/// Raw similarity (or distance, for euclidean) between two equal-length vectors.
	pub fn raw(self, a: &[f32], b: &[f32]) -> f64 {
		match self {
			Self::DotProduct => dot(a, b),
			Self::Cosine => {
				let norms = dot(a, a).sqrt() * dot(b, b).sqrt();

				if norms == 0.0 { 0.0 } else { dot(a, b) / norms }
			},
			Self::Euclidean => a
				.iter()
				.zip(b.iter())
				.map(|(x, y)| {
					let diff = (*x as f64) - (*y as f64);

					diff * diff
				})
				.sum::<f64>()
				.sqrt(),
		}
	}

	/// Normalized store score between two vectors.
	pub fn score(self, a: &[f32], b: &[f32]) -> f64 {
		self.normalize(self.raw(a, b))
	}
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
	a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}
