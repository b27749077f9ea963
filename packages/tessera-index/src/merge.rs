use std::collections::{BTreeMap, HashMap};

use tessera_domain::{Metadata, Record, ScoredRecord, Similarity, record};

#[derive(Default)]
struct Pieces {
	score: Option<f64>,
	chunks: BTreeMap<usize, Vec<f32>>,
	metadata: Option<Metadata>,
	data: Option<String>,
}
impl Pieces {
	fn absorb(
		&mut self,
		partition: usize,
		vector: Option<Vec<f32>>,
		metadata: Option<Metadata>,
		data: Option<String>,
	) {
		if let Some(vector) = vector {
			self.chunks.insert(partition, vector);
		}

		self.metadata = record::merge_metadata(self.metadata.take(), metadata);

		if self.data.is_none() {
			self.data = data;
		}
	}

	fn vector(&self, dimension: usize) -> Option<Vec<f32>> {
		let (&last, _) = self.chunks.last_key_value()?;
		let mut vector = Vec::with_capacity((last + 1) * dimension);

		for partition in 0..=last {
			match self.chunks.get(&partition) {
				Some(chunk) => vector.extend_from_slice(chunk),
				None => vector.resize(vector.len() + dimension, 0.0),
			}
		}

		Some(vector)
	}
}

/// Merges per-partition query hits by id.
///
/// Scores of the partitions that returned an id are recombined with the store's similarity;
/// partitions that did not return it contribute nothing. Vectors are concatenated in partition
/// order with zero chunks for gaps. The result is sorted by score and cut to `top_k`.
pub fn merge_scored(
	similarity: Similarity,
	dimension: usize,
	mut partials: Vec<(usize, Vec<ScoredRecord>)>,
	top_k: usize,
) -> Vec<ScoredRecord> {
	partials.sort_by_key(|(partition, _)| *partition);

	let mut order = Vec::new();
	let mut merged: HashMap<String, Pieces> = HashMap::new();

	for (partition, hits) in partials {
		for hit in hits {
			let pieces = merged.entry(hit.id.clone()).or_insert_with(|| {
				order.push(hit.id.clone());

				Pieces::default()
			});

			pieces.score = Some(match pieces.score {
				Some(previous) => similarity.combine(previous, hit.score),
				None => hit.score,
			});
			pieces.absorb(partition, hit.vector, hit.metadata, hit.data);
		}
	}

	let mut out: Vec<ScoredRecord> = order
		.into_iter()
		.filter_map(|id| {
			let pieces = merged.remove(&id)?;

			Some(ScoredRecord {
				score: pieces.score.unwrap_or_default(),
				vector: pieces.vector(dimension),
				metadata: pieces.metadata,
				data: pieces.data,
				id,
			})
		})
		.collect();

	out.sort_by(|a, b| tessera_domain::cmp_score_desc(a.score, b.score));
	out.truncate(top_k);

	out
}

/// Merges per-partition fetch slots position by position, without score recombination.
pub fn merge_records(
	dimension: usize,
	len: usize,
	mut partials: Vec<(usize, Vec<Option<Record>>)>,
) -> Vec<Option<Record>> {
	partials.sort_by_key(|(partition, _)| *partition);

	let mut slots: Vec<Option<(String, Pieces)>> = (0..len).map(|_| None).collect();

	for (partition, records) in partials {
		for (slot, record) in slots.iter_mut().zip(records) {
			let Some(record) = record else {
				continue;
			};
			let (_, pieces) = slot.get_or_insert_with(|| (record.id.clone(), Pieces::default()));

			pieces.absorb(partition, record.vector, record.metadata, record.data);
		}
	}

	slots
		.into_iter()
		.map(|slot| {
			slot.map(|(id, pieces)| Record {
				vector: pieces.vector(dimension),
				metadata: pieces.metadata,
				data: pieces.data,
				id,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(id: &str, score: f64, vector: &[f32]) -> ScoredRecord {
		ScoredRecord { vector: Some(vector.to_vec()), ..ScoredRecord::new(id, score) }
	}

	#[test]
	fn combines_scores_and_concatenates_vectors() {
		let merged = merge_scored(
			Similarity::DotProduct,
			2,
			vec![
				(1, vec![hit("a", 0.75, &[3.0, 4.0])]),
				(0, vec![hit("a", 0.6, &[1.0, 2.0]), hit("b", 0.9, &[5.0, 5.0])]),
			],
			10,
		);

		assert_eq!(merged[0].id, "b");
		assert_eq!(merged[0].vector, Some(vec![5.0, 5.0]));
		assert_eq!(merged[1].id, "a");
		assert!((merged[1].score - 0.85).abs() < 1e-12);
		assert_eq!(merged[1].vector, Some(vec![1.0, 2.0, 3.0, 4.0]));
	}

	#[test]
	fn fills_missing_partitions_with_zeros() {
		let merged = merge_scored(
			Similarity::Cosine,
			2,
			vec![(1, vec![hit("a", 0.7, &[3.0, 4.0])])],
			10,
		);

		assert_eq!(merged[0].vector, Some(vec![0.0, 0.0, 3.0, 4.0]));
		assert_eq!(merged[0].score, 0.7);
	}

	#[test]
	fn truncates_to_top_k() {
		let merged = merge_scored(
			Similarity::Cosine,
			1,
			vec![(0, vec![hit("a", 0.1, &[1.0]), hit("b", 0.2, &[1.0]), hit("c", 0.3, &[1.0])])],
			2,
		);

		assert_eq!(merged.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["c", "b"]);
	}

	#[test]
	fn fetch_slots_merge_by_position() {
		let merged = merge_records(
			2,
			2,
			vec![
				(0, vec![Some(Record::with_vector("a", vec![1.0, 2.0])), None]),
				(1, vec![Some(Record::with_vector("a", vec![3.0, 0.0])), None]),
			],
		);

		assert_eq!(merged[0].as_ref().and_then(|r| r.vector.clone()), Some(vec![1.0, 2.0, 3.0, 0.0]));
		assert!(merged[1].is_none());
	}
}
