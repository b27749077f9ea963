use serde_json::{Map, Value};

use crate::{BoxFuture, Error, Result};

/// A key-value store with JSON documents, string sets, pipelining and atomic scripts.
pub trait MetadataStore
where
	Self: Send + Sync,
{
	/// Runs `commands` in order as one round trip, returning one reply per command.
	fn pipeline<'a>(&'a self, commands: Vec<Command>) -> BoxFuture<'a, Result<Vec<Reply>>>;

	fn execute<'a>(&'a self, command: Command) -> BoxFuture<'a, Result<Reply>> {
		Box::pin(async move {
			self.pipeline(vec![command])
				.await?
				.pop()
				.ok_or_else(|| Error::InvalidArgument("Pipeline returned no reply.".to_string()))
		})
	}
}

/// JSON paths are lists of object keys; the empty path addresses the whole document.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
	/// Replies [`Reply::Json`].
	JsonGet { key: String, path: Vec<String> },
	/// Creates the document and intermediate objects as needed. Replies [`Reply::Ok`].
	JsonSet { key: String, path: Vec<String>, value: Value },
	/// Missing numbers count from zero. Replies the new value as [`Reply::Integer`].
	JsonIncr { key: String, path: Vec<String>, by: i64 },
	/// Replies the new array length as [`Reply::Integer`].
	JsonArrAppend { key: String, path: Vec<String>, value: Value },
	/// Removes JSON documents and sets alike. Replies the number of removed keys.
	Del { keys: Vec<String> },
	/// Replies the number of members added.
	SetAdd { key: String, members: Vec<String> },
	/// Replies the number of members removed.
	SetRemove { key: String, members: Vec<String> },
	/// Replies [`Reply::Bools`], one per member.
	SetIsMember { key: String, members: Vec<String> },
	/// Replies [`Reply::Members`] in ascending order.
	SetMembers { key: String },
	Script(Script),
}
impl Command {
	pub fn json_get(key: impl Into<String>, path: &[&str]) -> Self {
		Self::JsonGet { key: key.into(), path: to_path(path) }
	}

	pub fn json_set(key: impl Into<String>, path: &[&str], value: Value) -> Self {
		Self::JsonSet { key: key.into(), path: to_path(path), value }
	}

	pub fn json_incr(key: impl Into<String>, path: &[&str], by: i64) -> Self {
		Self::JsonIncr { key: key.into(), path: to_path(path), by }
	}
}

/// Server-side atomic operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Script {
	/// Stores `value` only when `key` is absent. Replies [`Reply::Bool`] with whether it was
	/// created.
	CreateIfAbsent { key: String, value: Value },
	/// Returns the index of `word` in the statistics document at `key`, assigning the next free
	/// index first when the word has none. Replies [`Reply::Integer`].
	AssignWordIndex { key: String, word: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
	Ok,
	Json(Option<Value>),
	Integer(i64),
	Bool(bool),
	Bools(Vec<bool>),
	Members(Vec<String>),
}
impl Reply {
	pub fn into_json(self) -> Result<Option<Value>> {
		match self {
			Self::Json(value) => Ok(value),
			other => Err(unexpected("JSON", &other)),
		}
	}

	pub fn into_integer(self) -> Result<i64> {
		match self {
			Self::Integer(value) => Ok(value),
			other => Err(unexpected("integer", &other)),
		}
	}

	pub fn into_bool(self) -> Result<bool> {
		match self {
			Self::Bool(value) => Ok(value),
			other => Err(unexpected("boolean", &other)),
		}
	}

	pub fn into_bools(self) -> Result<Vec<bool>> {
		match self {
			Self::Bools(values) => Ok(values),
			other => Err(unexpected("boolean list", &other)),
		}
	}

	pub fn into_members(self) -> Result<Vec<String>> {
		match self {
			Self::Members(members) => Ok(members),
			other => Err(unexpected("member list", &other)),
		}
	}
}

pub(crate) fn json_get(doc: Option<&Value>, path: &[String]) -> Option<Value> {
	let mut current = doc?;

	for segment in path {
		current = current.get(segment)?;
	}

	Some(current.clone())
}

pub(crate) fn json_set(doc: &mut Option<Value>, path: &[String], value: Value) -> Result<()> {
	let Some((last, parents)) = path.split_last() else {
		*doc = Some(value);

		return Ok(());
	};
	let parent = object_at(doc.get_or_insert_with(|| Value::Object(Map::new())), parents)?;

	parent.insert(last.clone(), value);

	Ok(())
}

pub(crate) fn json_incr(doc: &mut Option<Value>, path: &[String], by: i64) -> Result<i64> {
	let current = json_get(doc.as_ref(), path);
	let base = match current {
		None | Some(Value::Null) => 0,
		Some(value) => value.as_i64().ok_or_else(|| {
			Error::InvalidArgument(format!("Value at {path:?} is not an integer."))
		})?,
	};
	let next = base + by;

	json_set(doc, path, Value::from(next))?;

	Ok(next)
}

pub(crate) fn json_arr_append(doc: &mut Option<Value>, path: &[String], value: Value) -> Result<i64> {
	let mut array = match json_get(doc.as_ref(), path) {
		None | Some(Value::Null) => Vec::new(),
		Some(Value::Array(items)) => items,
		Some(_) => {
			return Err(Error::InvalidArgument(format!("Value at {path:?} is not an array.")));
		},
	};

	array.push(value);

	let len = array.len() as i64;

	json_set(doc, path, Value::Array(array))?;

	Ok(len)
}

pub(crate) fn assign_word_index(doc: &mut Option<Value>, key: &str, word: &str) -> Result<i64> {
	let stats = doc.as_mut().ok_or_else(|| Error::NotFound(format!("Statistics {key:?}.")))?;
	let index = tessera_domain::stats::assign_word_index(stats, word)
		.ok_or_else(|| Error::InvalidArgument(format!("Malformed statistics at {key:?}.")))?;

	Ok(index as i64)
}

fn object_at<'a>(root: &'a mut Value, path: &[String]) -> Result<&'a mut Map<String, Value>> {
	let mut current = root;

	for segment in path {
		let map = current
			.as_object_mut()
			.ok_or_else(|| Error::InvalidArgument(format!("Path segment {segment:?} is not in an object.")))?;

		current = map.entry(segment.clone()).or_insert_with(|| Value::Object(Map::new()));
	}

	current
		.as_object_mut()
		.ok_or_else(|| Error::InvalidArgument(format!("Value at {path:?} is not an object.")))
}

fn to_path(path: &[&str]) -> Vec<String> {
	path.iter().map(|segment| segment.to_string()).collect()
}

fn unexpected(expected: &str, reply: &Reply) -> Error {
	Error::InvalidArgument(format!("Expected a {expected} reply, got {reply:?}."))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn path(segments: &[&str]) -> Vec<String> {
		to_path(segments)
	}

	#[test]
	fn set_creates_intermediate_objects() {
		let mut doc = None;

		json_set(&mut doc, &path(&["a", "b"]), json!(1)).expect("set");

		assert_eq!(doc, Some(json!({ "a": { "b": 1 } })));
		assert_eq!(json_get(doc.as_ref(), &path(&["a", "b"])), Some(json!(1)));
		assert_eq!(json_get(doc.as_ref(), &path(&["a", "c"])), None);
	}

	#[test]
	fn incr_counts_from_zero() {
		let mut doc = Some(json!({ "n": 2 }));

		assert_eq!(json_incr(&mut doc, &path(&["n"]), -3).expect("incr"), -1);
		assert_eq!(json_incr(&mut doc, &path(&["m"]), 4).expect("incr"), 4);
	}

	#[test]
	fn incr_rejects_non_numbers() {
		let mut doc = Some(json!({ "n": "x" }));

		assert!(json_incr(&mut doc, &path(&["n"]), 1).is_err());
	}

	#[test]
	fn arr_append_reports_length() {
		let mut doc = Some(json!({ "items": [1] }));

		assert_eq!(json_arr_append(&mut doc, &path(&["items"]), json!(2)).expect("append"), 2);
		assert_eq!(doc, Some(json!({ "items": [1, 2] })));
	}
}
