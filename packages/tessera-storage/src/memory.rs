//! In-process stores for tests and single-node use.

use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	sync::{Arc, Mutex, MutexGuard},
};

use serde_json::Value;

use crate::{
	BoxFuture, Error, FetchOptions, IndexInfo, QueryRequest, RangePage, RangeRequest, Result,
	UpdateRequest, VectorStore,
	metadata::{self, Command, MetadataStore, Reply, Script},
};
use tessera_domain::{Metadata, Record, ScoredRecord, Similarity, record};

/// Turns payload-only records and queries into vectors.
pub type Embedder = Arc<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

#[derive(Clone, Debug)]
struct StoredPoint {
	vector: Vec<f32>,
	metadata: Option<Metadata>,
	data: Option<String>,
}

/// Brute-force vector store with a fixed dimension.
pub struct MemoryVectorStore {
	dimension: usize,
	similarity: Similarity,
	embedder: Option<Embedder>,
	namespaces: Mutex<HashMap<String, BTreeMap<String, StoredPoint>>>,
}
impl MemoryVectorStore {
	pub fn new(dimension: usize, similarity: Similarity) -> Self {
		Self { dimension, similarity, embedder: None, namespaces: Mutex::new(HashMap::new()) }
	}

	pub fn with_embedder(mut self, embedder: Embedder) -> Self {
		self.embedder = Some(embedder);

		self
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<String, BTreeMap<String, StoredPoint>>> {
		self.namespaces.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn resolve_vector(&self, vector: Option<Vec<f32>>, data: Option<&str>) -> Result<Vec<f32>> {
		let vector = match (vector, data) {
			(Some(vector), _) => vector,
			(None, Some(data)) => match &self.embedder {
				Some(embed) => embed(data),
				None => {
					return Err(Error::InvalidArgument(
						"Payload-only records need an embedder.".to_string(),
					));
				},
			},
			(None, None) => {
				return Err(Error::InvalidArgument(
					"Record carries neither a vector nor data.".to_string(),
				));
			},
		};

		if vector.len() != self.dimension {
			return Err(Error::DimensionMismatch { expected: self.dimension, actual: vector.len() });
		}

		Ok(vector)
	}

	fn to_record(id: &str, point: &StoredPoint, options: FetchOptions) -> Record {
		Record {
			id: id.to_string(),
			vector: options.include_vectors.then(|| point.vector.clone()),
			data: if options.include_data { point.data.clone() } else { None },
			metadata: if options.include_metadata { point.metadata.clone() } else { None },
		}
	}
}
impl VectorStore for MemoryVectorStore {
	fn upsert<'a>(&'a self, namespace: &'a str, records: Vec<Record>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut points = Vec::with_capacity(records.len());

			for record in records {
				let vector = self.resolve_vector(record.vector, record.data.as_deref())?;

				points.push((
					record.id,
					StoredPoint { vector, metadata: record.metadata, data: record.data },
				));
			}

			self.lock().entry(namespace.to_string()).or_default().extend(points);

			Ok(())
		})
	}

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		request: QueryRequest,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>> {
		Box::pin(async move {
			let vector = self.resolve_vector(request.vector, request.data.as_deref())?;
			let namespaces = self.lock();
			let Some(points) = namespaces.get(namespace) else {
				return Ok(Vec::new());
			};
			let mut scored: Vec<ScoredRecord> = points
				.iter()
				.map(|(id, point)| ScoredRecord {
					id: id.clone(),
					score: self.similarity.score(&point.vector, &vector),
					vector: request.include_vectors.then(|| point.vector.clone()),
					metadata: if request.include_metadata { point.metadata.clone() } else { None },
					data: point.data.clone(),
				})
				.collect();

			scored.sort_by(|a, b| tessera_domain::cmp_score_desc(a.score, b.score));
			scored.truncate(request.top_k);

			Ok(scored)
		})
	}

	fn fetch<'a>(
		&'a self,
		namespace: &'a str,
		ids: &'a [String],
		options: FetchOptions,
	) -> BoxFuture<'a, Result<Vec<Option<Record>>>> {
		Box::pin(async move {
			let namespaces = self.lock();
			let points = namespaces.get(namespace);

			Ok(ids
				.iter()
				.map(|id| {
					points
						.and_then(|points| points.get(id))
						.map(|point| Self::to_record(id, point, options))
				})
				.collect())
		})
	}

	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move {
			let mut namespaces = self.lock();
			let Some(points) = namespaces.get_mut(namespace) else {
				return Ok(0);
			};

			Ok(ids.iter().filter(|id| points.remove(id.as_str()).is_some()).count())
		})
	}

	fn update<'a>(
		&'a self,
		namespace: &'a str,
		request: UpdateRequest,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			if let Some(vector) = &request.vector
				&& vector.len() != self.dimension
			{
				return Err(Error::DimensionMismatch {
					expected: self.dimension,
					actual: vector.len(),
				});
			}

			let mut namespaces = self.lock();
			let Some(point) =
				namespaces.get_mut(namespace).and_then(|points| points.get_mut(&request.id))
			else {
				return Ok(false);
			};

			if let Some(vector) = request.vector {
				point.vector = vector;
			}
			if request.metadata.is_some() {
				point.metadata = record::merge_metadata(point.metadata.take(), request.metadata);
			}

			Ok(true)
		})
	}

	fn range<'a>(
		&'a self,
		namespace: &'a str,
		request: RangeRequest,
	) -> BoxFuture<'a, Result<RangePage>> {
		Box::pin(async move {
			let namespaces = self.lock();
			let Some(points) = namespaces.get(namespace) else {
				return Ok(RangePage::default());
			};
			let options = FetchOptions {
				include_vectors: request.include_vectors,
				include_metadata: request.include_metadata,
				include_data: true,
			};
			let start = request.cursor.unwrap_or_default();
			let mut iter = points.range(start..);
			let items: Vec<Record> = iter
				.by_ref()
				.take(request.limit)
				.map(|(id, point)| Self::to_record(id, point, options))
				.collect();
			let next_cursor = iter.next().map(|(id, _)| id.clone());

			Ok(RangePage { items, next_cursor })
		})
	}

	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.lock().entry(namespace.to_string()).or_default().clear();

			Ok(())
		})
	}

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.lock().remove(namespace);

			Ok(())
		})
	}

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>> {
		Box::pin(async move {
			let namespaces = self
				.lock()
				.iter()
				.map(|(namespace, points)| (namespace.clone(), points.len()))
				.collect();

			Ok(IndexInfo { dimension: self.dimension, similarity: self.similarity, namespaces })
		})
	}

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let mut namespaces: Vec<String> = self.lock().keys().cloned().collect();

			namespaces.sort();

			Ok(namespaces)
		})
	}
}

#[derive(Default)]
struct MetadataState {
	json: HashMap<String, Value>,
	sets: HashMap<String, BTreeSet<String>>,
}

/// Metadata store that runs each pipeline under a single lock.
#[derive(Default)]
pub struct MemoryMetadataStore {
	state: Mutex<MetadataState>,
}
impl MemoryMetadataStore {
	pub fn new() -> Self {
		Self::default()
	}
}
impl MetadataStore for MemoryMetadataStore {
	fn pipeline<'a>(&'a self, commands: Vec<Command>) -> BoxFuture<'a, Result<Vec<Reply>>> {
		Box::pin(async move {
			let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
			let mut replies = Vec::with_capacity(commands.len());

			for command in commands {
				replies.push(apply(&mut state, command)?);
			}

			Ok(replies)
		})
	}
}

fn apply(state: &mut MetadataState, command: Command) -> Result<Reply> {
	match command {
		Command::JsonGet { key, path } =>
			Ok(Reply::Json(metadata::json_get(state.json.get(&key), &path))),
		Command::JsonSet { key, path, value } => {
			with_document(state, key, |doc| metadata::json_set(doc, &path, value))?;

			Ok(Reply::Ok)
		},
		Command::JsonIncr { key, path, by } =>
			with_document(state, key, |doc| metadata::json_incr(doc, &path, by)).map(Reply::Integer),
		Command::JsonArrAppend { key, path, value } =>
			with_document(state, key, |doc| metadata::json_arr_append(doc, &path, value))
				.map(Reply::Integer),
		Command::Del { keys } => {
			let removed = keys
				.iter()
				.filter(|key| {
					let json = state.json.remove(key.as_str()).is_some();
					let set = state.sets.remove(key.as_str()).is_some();

					json || set
				})
				.count();

			Ok(Reply::Integer(removed as i64))
		},
		Command::SetAdd { key, members } => {
			let set = state.sets.entry(key).or_default();
			let added = members.into_iter().filter(|member| set.insert(member.clone())).count();

			Ok(Reply::Integer(added as i64))
		},
		Command::SetRemove { key, members } => {
			let Some(set) = state.sets.get_mut(&key) else {
				return Ok(Reply::Integer(0));
			};
			let removed = members.iter().filter(|member| set.remove(member.as_str())).count();

			if set.is_empty() {
				state.sets.remove(&key);
			}

			Ok(Reply::Integer(removed as i64))
		},
		Command::SetIsMember { key, members } => {
			let set = state.sets.get(&key);

			Ok(Reply::Bools(
				members
					.iter()
					.map(|member| set.map(|set| set.contains(member)).unwrap_or(false))
					.collect(),
			))
		},
		Command::SetMembers { key } => Ok(Reply::Members(
			state.sets.get(&key).map(|set| set.iter().cloned().collect()).unwrap_or_default(),
		)),
		Command::Script(Script::CreateIfAbsent { key, value }) => {
			if state.json.contains_key(&key) {
				return Ok(Reply::Bool(false));
			}

			state.json.insert(key, value);

			Ok(Reply::Bool(true))
		},
		Command::Script(Script::AssignWordIndex { key, word }) =>
			with_document(state, key.clone(), |doc| metadata::assign_word_index(doc, &key, &word))
				.map(Reply::Integer),
	}
}

fn with_document<T>(
	state: &mut MetadataState,
	key: String,
	f: impl FnOnce(&mut Option<Value>) -> Result<T>,
) -> Result<T> {
	let mut doc = state.json.remove(&key);
	let result = f(&mut doc);

	if let Some(doc) = doc {
		state.json.insert(key, doc);
	}

	result
}
