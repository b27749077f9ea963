use tessera_domain::ScoredRecord;

use crate::{Accumulator, Fusion};

pub const DEFAULT_K: f64 = 60.0;

/// Reciprocal rank fusion. The item at zero-based rank `r` of a list contributes `1 / (k + r)`;
/// scores only decide the order within each list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rrf {
	pub k: f64,
}
impl Rrf {
	pub fn new(k: f64) -> Self {
		Self { k }
	}
}
impl Default for Rrf {
	fn default() -> Self {
		Self::new(DEFAULT_K)
	}
}
impl Fusion for Rrf {
	fn fuse(&self, lists: Vec<Vec<ScoredRecord>>) -> Vec<ScoredRecord> {
		let mut acc = Accumulator::default();

		for list in lists {
			for (rank, hit) in crate::ranked(list).into_iter().enumerate() {
				acc.add(hit, 1.0 / (self.k + rank as f64));
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

	fn ids_and_scores(fused: &[ScoredRecord]) -> Vec<(&str, f64)> {
		fused.iter().map(|hit| (hit.id.as_str(), hit.score)).collect()
	}

	#[test]
	fn agreeing_lists_double_each_rank() {
		let fused = Rrf::default().fuse(vec![
			list(&[("a", 0.7), ("b", 0.8), ("c", 0.9)]),
			list(&[("a", 0.6), ("b", 0.7), ("c", 0.8)]),
		]);

		assert_eq!(ids_and_scores(&fused), vec![
			("c", 2.0 / 60.0),
			("b", 2.0 / 61.0),
			("a", 2.0 / 62.0)
		]);
	}

	#[test]
	fn opposing_lists_tie_at_the_ends() {
		let fused = Rrf::default().fuse(vec![
			list(&[("a", 0.7), ("b", 0.8), ("c", 0.9)]),
			list(&[("a", 0.8), ("b", 0.7), ("c", 0.6)]),
		]);

		assert_eq!(ids_and_scores(&fused), vec![
			("c", 1.0 / 60.0 + 1.0 / 62.0),
			("a", 1.0 / 62.0 + 1.0 / 60.0),
			("b", 2.0 / 61.0)
		]);
	}

	#[test]
	fn ids_unique_to_one_list_keep_their_single_term() {
		let fused = Rrf::default().fuse(vec![list(&[("a", 1.0)]), list(&[("b", 1.0), ("c", 0.5)])]);

		assert_eq!(ids_and_scores(&fused), vec![
			("a", 1.0 / 60.0),
			("b", 1.0 / 60.0),
			("c", 1.0 / 61.0)
		]);
		assert!(Rrf::default().fuse(Vec::new()).is_empty());
	}
}
