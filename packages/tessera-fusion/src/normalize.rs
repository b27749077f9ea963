use tessera_domain::ScoredRecord;

use crate::{Accumulator, Fusion};

/// Rescales each list to `(score - min) / (max - min)` before summing. A list whose scores are
/// all equal contributes 1 per item.
#[derive(Clone, Copy, Debug, Default)]
pub struct MinMaxNormalization;
impl Fusion for MinMaxNormalization {
	fn fuse(&self, lists: Vec<Vec<ScoredRecord>>) -> Vec<ScoredRecord> {
		let mut acc = Accumulator::default();

		for list in lists {
			let list = crate::ranked(list);
			let (Some(max), Some(min)) =
				(list.first().map(|hit| hit.score), list.last().map(|hit| hit.score))
			else {
				continue;
			};
			let range = max - min;

			for hit in list {
				let contribution = if range == 0.0 { 1.0 } else { (hit.score - min) / range };

				acc.add(hit, contribution);
			}
		}

		acc.finish()
	}
}

/// Rescales each list to `(score - mean) / stddev` (population deviation) before summing.
///
/// A list with zero deviation contributes nothing, though its ids still appear in the output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardNormalization;
impl Fusion for StandardNormalization {
	fn fuse(&self, lists: Vec<Vec<ScoredRecord>>) -> Vec<ScoredRecord> {
		let mut acc = Accumulator::default();

		for list in lists {
			if list.is_empty() {
				continue;
			}

			let list = crate::ranked(list);
			let len = list.len() as f64;
			let mean = list.iter().map(|hit| hit.score).sum::<f64>() / len;
			let variance = list.iter().map(|hit| (hit.score - mean).powi(2)).sum::<f64>() / len;
			let deviation = variance.sqrt();

			if deviation == 0.0 {
				tracing::debug!(items = list.len(), "Skipping fusion list with zero deviation.");
			}

			for hit in list {
				let contribution =
					if deviation == 0.0 { 0.0 } else { (hit.score - mean) / deviation };

				acc.add(hit, contribution);
			}
		}

		acc.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn list(scores: &[(&str, f64)]) -> Vec<ScoredRecord> {
		scores.iter().map(|(id, score)| ScoredRecord::new(*id, *score)).collect()
	}

	fn ascending() -> Vec<ScoredRecord> {
		list(&[("a", 0.7), ("b", 0.8), ("c", 0.9)])
	}

	#[test]
	fn min_max_sums_rescaled_scores() {
		let fused =
			MinMaxNormalization.fuse(vec![ascending(), list(&[("a", 0.6), ("b", 0.7), ("c", 0.8)])]);
		let ids: Vec<&str> = fused.iter().map(|hit| hit.id.as_str()).collect();

		assert_eq!(ids, vec!["c", "b", "a"]);
		assert!((fused[0].score - 2.0).abs() < 1e-9);
		assert!((fused[1].score - 1.0).abs() < 1e-9);
		assert!(fused[2].score.abs() < 1e-9);
	}

	#[test]
	fn min_max_flat_lists_contribute_one() {
		let fused = MinMaxNormalization.fuse(vec![list(&[("a", 0.3), ("b", 0.3)])]);

		assert!(fused.iter().all(|hit| hit.score == 1.0));
		assert!(MinMaxNormalization.fuse(vec![Vec::new()]).is_empty());
	}

	#[test]
	fn standard_scores_sum_per_id() {
		let fused = StandardNormalization
			.fuse(vec![ascending(), list(&[("a", 0.6), ("b", 0.7), ("c", 0.8)])]);
		let deviation = (0.02_f64 / 3.0).sqrt();

		assert_eq!(fused[0].id, "c");
		assert!((fused[0].score - 0.2 / deviation).abs() < 1e-6);
		assert_eq!(fused[1].id, "b");
		assert!(fused[1].score.abs() < 1e-6);
		assert_eq!(fused[2].id, "a");
		assert!((fused[2].score + 0.2 / deviation).abs() < 1e-6);
	}

	#[test]
	fn standard_opposing_lists_cancel() {
		let fused = StandardNormalization
			.fuse(vec![ascending(), list(&[("a", 0.8), ("b", 0.7), ("c", 0.6)])]);

		assert_eq!(fused.len(), 3);
		assert!(fused.iter().all(|hit| hit.score.abs() < 1e-6));
	}

	#[test]
	fn standard_skips_flat_lists() {
		let fused = StandardNormalization.fuse(vec![list(&[("a", 0.5), ("b", 0.5), ("c", 0.5)])]);

		assert_eq!(fused.len(), 3);
		assert!(fused.iter().all(|hit| hit.score == 0.0));
	}
}
