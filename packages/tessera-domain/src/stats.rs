use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const WORD_STATISTICS: &str = "word_statistics";
pub const INDEX_STATISTICS: &str = "index_statistics";
pub const NUMBER_OF_WORDS: &str = "number_of_words";
pub const DOCUMENTS_CONTAINING_WORD: &str = "documents_containing_word";
pub const WORD_INDEX: &str = "index";
pub const NUMBER_OF_DOCUMENTS: &str = "number_of_documents";
pub const TOTAL_DOCUMENT_LENGTH: &str = "total_document_length";
pub const INDEXED_NUMBER_OF_DOCUMENTS: &str = "indexed_number_of_documents";
pub const INDEXED_TOTAL_DOCUMENT_LENGTH: &str = "indexed_total_document_length";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStatistic {
	pub documents_containing_word: i64,
	/// Column of this word in every sparse vector of the namespace. Never reassigned.
	#[serde(default)]
	pub index: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
	pub number_of_documents: i64,
	pub total_document_length: i64,
	/// Baseline frozen at the last rebuild; only used for the average document length.
	pub indexed_number_of_documents: i64,
	pub indexed_total_document_length: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStatistics {
	#[serde(default)]
	pub word_statistics: HashMap<String, WordStatistic>,
	#[serde(default)]
	pub index_statistics: IndexStatistics,
	#[serde(default)]
	pub number_of_words: i64,
}
impl NamespaceStatistics {
	pub fn word_index(&self, word: &str) -> Option<u64> {
		self.word_statistics.get(word).and_then(|stat| stat.index)
	}

	pub fn documents_containing(&self, word: &str) -> i64 {
		self.word_statistics.get(word).map(|stat| stat.documents_containing_word).unwrap_or(0)
	}

	/// Width of the sparse vectors built from these statistics.
	pub fn vector_width(&self) -> usize {
		let highest =
			self.word_statistics.values().filter_map(|stat| stat.index).max().map(|idx| idx + 1);

		(self.number_of_words.max(0) as u64).max(highest.unwrap_or(0)) as usize
	}

	pub fn baseline_is_empty(&self) -> bool {
		self.index_statistics.indexed_number_of_documents == 0
			&& self.index_statistics.indexed_total_document_length == 0
	}

	pub fn baseline_average_length(&self) -> f64 {
		average(
			self.index_statistics.indexed_total_document_length,
			self.index_statistics.indexed_number_of_documents,
		)
	}

	pub fn live_average_length(&self) -> f64 {
		average(
			self.index_statistics.total_document_length,
			self.index_statistics.number_of_documents,
		)
	}

	pub fn needs_rebuild(&self, policy: &RebuildPolicy) -> bool {
		if self.baseline_is_empty() {
			return true;
		}
		// An emptied namespace keeps its last baseline until documents return.
		if self.index_statistics.number_of_documents == 0 {
			return false;
		}

		let live = self.index_statistics.number_of_documents as f64;
		let baseline = self.index_statistics.indexed_number_of_documents as f64;
		let count_drifted =
			baseline > policy.document_ratio * live || live > policy.document_ratio * baseline;
		let baseline_avg = self.baseline_average_length();
		let length_drifted =
			(self.live_average_length() - baseline_avg).abs() > policy.length_drift * baseline_avg;

		count_drifted && length_drifted
	}

	/// Freezes the live counters as the new baseline.
	pub fn snapshot_baseline(&mut self) {
		self.index_statistics.indexed_number_of_documents =
			self.index_statistics.number_of_documents;
		self.index_statistics.indexed_total_document_length =
			self.index_statistics.total_document_length;
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RebuildPolicy {
	/// Baseline and live document counts may differ by this factor before a rebuild.
	pub document_ratio: f64,
	/// Relative change of the average document length tolerated before a rebuild.
	pub length_drift: f64,
}
impl Default for RebuildPolicy {
	fn default() -> Self {
		Self { document_ratio: 2.0, length_drift: 0.1 }
	}
}

/// Token summary of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentTerms {
	pub length: usize,
	/// Term frequencies in order of first appearance.
	pub frequencies: Vec<(String, u32)>,
}
impl DocumentTerms {
	pub fn from_tokens(tokens: Vec<String>) -> Self {
		let length = tokens.len();
		let mut positions: HashMap<String, usize> = HashMap::new();
		let mut frequencies: Vec<(String, u32)> = Vec::new();

		for token in tokens {
			match positions.get(&token) {
				Some(&pos) => frequencies[pos].1 += 1,
				None => {
					positions.insert(token.clone(), frequencies.len());
					frequencies.push((token, 1));
				},
			}
		}

		Self { length, frequencies }
	}

	pub fn words(&self) -> impl Iterator<Item = &str> {
		self.frequencies.iter().map(|(word, _)| word.as_str())
	}
}

/// Assigns the next free index to `word` inside a statistics JSON document unless it already has
/// one. Returns the word's index, or `None` when the document is not shaped like
/// [`NamespaceStatistics`].
///
/// Metadata stores run this as one atomic step.
pub fn assign_word_index(stats: &mut Value, word: &str) -> Option<u64> {
	let root = stats.as_object_mut()?;
	let next = root.get(NUMBER_OF_WORDS).map(Value::as_u64).unwrap_or(Some(0))?;
	let words = root
		.entry(WORD_STATISTICS.to_string())
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()?;

	if let Some(index) = words.get(word).and_then(|entry| entry.get(WORD_INDEX)).and_then(Value::as_u64)
	{
		return Some(index);
	}

	let entry = words.entry(word.to_string()).or_insert_with(|| {
		let mut fresh = Map::new();

		fresh.insert(DOCUMENTS_CONTAINING_WORD.to_string(), Value::from(0));

		Value::Object(fresh)
	});

	entry.as_object_mut()?.insert(WORD_INDEX.to_string(), Value::from(next));
	root.insert(NUMBER_OF_WORDS.to_string(), Value::from(next + 1));

	Some(next)
}

fn average(total: i64, count: i64) -> f64 {
	if count <= 0 { 0.0 } else { total as f64 / count as f64 }
}
