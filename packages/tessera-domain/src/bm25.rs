use crate::stats::{DocumentTerms, NamespaceStatistics};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
	/// Term frequency saturation.
	pub k: f64,
	/// Document length normalization strength, in `0..=1`.
	pub b: f64,
}
impl Default for Bm25Params {
	fn default() -> Self {
		Self { k: 1.5, b: 0.75 }
	}
}

/// `ln((N + 1) / (df + 0.5))` over the live document count.
pub fn idf(stats: &NamespaceStatistics, word: &str) -> f64 {
	let documents = stats.index_statistics.number_of_documents as f64;
	let containing = stats.documents_containing(word) as f64;

	((documents + 1.0) / (containing + 0.5)).ln()
}

pub fn term_weight(
	idf: f64,
	term_frequency: f64,
	document_length: f64,
	average_length: f64,
	params: &Bm25Params,
) -> f64 {
	let length_ratio = if average_length > 0.0 { document_length / average_length } else { 1.0 };
	let norm = params.k * (1.0 - params.b + params.b * length_ratio);

	idf * term_frequency * (params.k + 1.0) / (term_frequency + norm)
}

/// Sparse BM25 weight vector of one document against the baseline average length.
///
/// Words without an assigned index are left out.
pub fn document_vector(
	stats: &NamespaceStatistics,
	terms: &DocumentTerms,
	params: &Bm25Params,
) -> Vec<f32> {
	let mut vector = vec![0.0_f32; stats.vector_width()];
	let average_length = stats.baseline_average_length();

	for (word, frequency) in &terms.frequencies {
		let Some(index) = stats.word_index(word) else {
			continue;
		};
		let weight = term_weight(
			idf(stats, word),
			*frequency as f64,
			terms.length as f64,
			average_length,
			params,
		);

		if let Some(slot) = vector.get_mut(index as usize) {
			*slot = weight as f32;
		}
	}

	vector
}

/// IDF-only query vector. Repeated and unknown words contribute once and nothing, respectively.
pub fn query_vector(stats: &NamespaceStatistics, words: &[String]) -> Vec<f32> {
	let mut vector = vec![0.0_f32; stats.vector_width()];

	for word in words {
		let Some(index) = stats.word_index(word) else {
			continue;
		};

		if let Some(slot) = vector.get_mut(index as usize) {
			*slot = idf(stats, word) as f32;
		}
	}

	vector
}
