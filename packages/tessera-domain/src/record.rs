use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

/// A text document as submitted by callers of the search methods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub id: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
}
impl Document {
	pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
		Self { id: id.into(), text: text.into(), metadata: None }
	}

	pub fn with_metadata(mut self, metadata: Metadata) -> Self {
		self.metadata = Some(metadata);

		self
	}
}

/// A vector store row. Rows without a vector carry `data` for server-side embedding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector: Option<Vec<f32>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
}
impl Record {
	pub fn with_vector(id: impl Into<String>, vector: Vec<f32>) -> Self {
		Self { id: id.into(), vector: Some(vector), ..Default::default() }
	}

	pub fn with_data(id: impl Into<String>, data: impl Into<String>) -> Self {
		Self { id: id.into(), data: Some(data.into()), ..Default::default() }
	}

	pub fn metadata(mut self, metadata: Option<Metadata>) -> Self {
		self.metadata = metadata;

		self
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
	pub id: String,
	pub score: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector: Option<Vec<f32>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}
impl ScoredRecord {
	pub fn new(id: impl Into<String>, score: f64) -> Self {
		Self { id: id.into(), score, ..Default::default() }
	}
}

/// Shallow merge where fields from `next` replace fields already in `base`.
pub fn merge_metadata(base: Option<Metadata>, next: Option<Metadata>) -> Option<Metadata> {
	match (base, next) {
		(Some(mut base), Some(next)) => {
			base.extend(next);

			Some(base)
		},
		(base, None) => base,
		(None, next) => next,
	}
}

/// A text search request against one namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct TextQuery {
	pub text: String,
	pub top_k: usize,
	pub include_vectors: bool,
	pub include_metadata: bool,
}
impl TextQuery {
	pub fn new(text: impl Into<String>, top_k: usize) -> Self {
		Self { text: text.into(), top_k, include_vectors: false, include_metadata: true }
	}

	pub fn include_vectors(mut self, include: bool) -> Self {
		self.include_vectors = include;

		self
	}
}

/// Change to one stored document.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentUpdate {
	/// Shallow-merges metadata; statistics are untouched.
	Metadata { id: String, metadata: Metadata },
	/// Replaces the text, optionally merging metadata as well.
	Text { id: String, text: String, metadata: Option<Metadata> },
	/// Replaces the stored vector as-is.
	Vector { id: String, vector: Vec<f32> },
}
impl DocumentUpdate {
	pub fn id(&self) -> &str {
		match self {
			Self::Metadata { id, .. } | Self::Text { id, .. } | Self::Vector { id, .. } => id,
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn later_metadata_wins() {
		let base = json!({ "a": 1, "b": 1 }).as_object().cloned();
		let next = json!({ "b": 2, "c": 3 }).as_object().cloned();

		assert_eq!(merge_metadata(base, next), json!({ "a": 1, "b": 2, "c": 3 }).as_object().cloned());
		assert_eq!(merge_metadata(None, None), None);
	}
}
