use std::{
	collections::{BTreeMap, HashMap, HashSet},
	sync::Mutex,
};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, DeletePointsBuilder, Distance, Document, GetPointsBuilder, PointId,
		PointStruct, PointsIdsList, Query, QueryPointsBuilder, RetrievedPoint, ScrollPointsBuilder,
		UpsertPointsBuilder, Value, Vector, VectorOutput, VectorParamsBuilder,
		VectorsConfigBuilder, VectorsOutput, point_id::PointIdOptions, value::Kind, vector_output,
		vectors_output::VectorsOptions,
	},
};
use uuid::Uuid;

use crate::{
	BoxFuture, Error, FetchOptions, IndexInfo, QueryRequest, RangePage, RangeRequest, Result,
	UpdateRequest, VectorStore,
};
use tessera_domain::{Metadata, Record, ScoredRecord, Similarity, record};

pub const VECTOR_NAME: &str = "dense";

const PAYLOAD_ID: &str = "id";
const PAYLOAD_METADATA: &str = "metadata";
const PAYLOAD_DATA: &str = "data";

/// Qdrant-backed store with one collection per namespace.
pub struct QdrantStore {
	pub client: Qdrant,
	pub collection_prefix: String,
	pub vector_dim: u32,
	pub similarity: Similarity,
	pub inference_model: Option<String>,
	distance: Distance,
	known: Mutex<HashSet<String>>,
}
impl QdrantStore {
	pub fn new(cfg: &tessera_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;
		let (distance, similarity) = parse_distance(&cfg.distance)?;

		Ok(Self {
			client,
			collection_prefix: cfg.collection_prefix.clone(),
			vector_dim: cfg.vector_dim,
			similarity,
			inference_model: cfg.inference_model.clone(),
			distance,
			known: Mutex::new(HashSet::new()),
		})
	}

	pub fn collection_name(&self, namespace: &str) -> String {
		if namespace.is_empty() {
			self.collection_prefix.clone()
		} else {
			format!("{}-{namespace}", self.collection_prefix)
		}
	}

	fn namespace_of(&self, collection: &str) -> Option<String> {
		if collection == self.collection_prefix {
			return Some(String::new());
		}

		collection
			.strip_prefix(self.collection_prefix.as_str())
			.and_then(|rest| rest.strip_prefix('-'))
			.map(str::to_string)
	}

	fn forget(&self, collection: &str) {
		self.known.lock().unwrap_or_else(|err| err.into_inner()).remove(collection);
	}

	/// Returns whether the collection exists, creating it first when `create` is set.
	async fn collection_ready(&self, collection: &str, create: bool) -> Result<bool> {
		if self.known.lock().unwrap_or_else(|err| err.into_inner()).contains(collection) {
			return Ok(true);
		}

		let exists = self.client.collection_exists(collection.to_string()).await?;

		if !exists && !create {
			return Ok(false);
		}
		if !exists {
			self.create_collection(collection).await?;
		}

		self.known.lock().unwrap_or_else(|err| err.into_inner()).insert(collection.to_string());

		Ok(true)
	}

	async fn create_collection(&self, collection: &str) -> Result<()> {
		let mut vectors = VectorsConfigBuilder::default();

		vectors.add_named_vector_params(
			VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim as u64, self.distance),
		);
		self.client
			.create_collection(CreateCollectionBuilder::new(collection).vectors_config(vectors))
			.await?;

		tracing::info!(collection, dimension = self.vector_dim, "Created Qdrant collection.");

		Ok(())
	}

	fn vector_for(&self, vector: Option<Vec<f32>>, data: Option<&str>) -> Result<Vector> {
		match (vector, data) {
			(Some(vector), _) => {
				if vector.len() != self.vector_dim as usize {
					return Err(Error::DimensionMismatch {
						expected: self.vector_dim as usize,
						actual: vector.len(),
					});
				}

				Ok(Vector::from(vector))
			},
			(None, Some(data)) => {
				let model = self.inference_model.as_deref().ok_or_else(|| {
					Error::InvalidArgument(
						"Payload-only records need storage.qdrant.inference_model.".to_string(),
					)
				})?;

				Ok(Vector::from(Document::new(data.to_string(), model)))
			},
			(None, None) => Err(Error::InvalidArgument(
				"Record carries neither a vector nor data.".to_string(),
			)),
		}
	}

	fn point(&self, record: Record) -> Result<PointStruct> {
		let point_id = point_id(&record.id);
		let vector = self.vector_for(record.vector, record.data.as_deref())?;
		let mut vectors = HashMap::new();

		vectors.insert(VECTOR_NAME.to_string(), vector);

		Ok(PointStruct::new(
			point_id,
			vectors,
			Payload::from(payload(&record.id, record.metadata.as_ref(), record.data.as_deref())?),
		))
	}

	async fn get(
		&self,
		collection: &str,
		ids: &[String],
		with_vectors: bool,
	) -> Result<Vec<RetrievedPoint>> {
		let point_ids: Vec<PointId> = ids.iter().map(|id| PointId::from(point_id(id))).collect();
		let response = self
			.client
			.get_points(
				GetPointsBuilder::new(collection, point_ids)
					.with_payload(true)
					.with_vectors(with_vectors),
			)
			.await?;

		Ok(response.result)
	}
}
impl VectorStore for QdrantStore {
	fn upsert<'a>(&'a self, namespace: &'a str, records: Vec<Record>) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if records.is_empty() {
				return Ok(());
			}

			let collection = self.collection_name(namespace);
			let points =
				records.into_iter().map(|record| self.point(record)).collect::<Result<Vec<_>>>()?;

			self.collection_ready(&collection, true).await?;
			self.client.upsert_points(UpsertPointsBuilder::new(collection, points).wait(true)).await?;

			Ok(())
		})
	}

	fn query<'a>(
		&'a self,
		namespace: &'a str,
		request: QueryRequest,
	) -> BoxFuture<'a, Result<Vec<ScoredRecord>>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);
			let query = match (request.vector, request.data) {
				(Some(vector), _) => Query::new_nearest(vector),
				(None, Some(data)) => {
					let model = self.inference_model.as_deref().ok_or_else(|| {
						Error::InvalidArgument(
							"Payload queries need storage.qdrant.inference_model.".to_string(),
						)
					})?;

					Query::new_nearest(Document::new(data, model))
				},
				(None, None) => {
					return Err(Error::InvalidArgument(
						"Query carries neither a vector nor data.".to_string(),
					));
				},
			};

			if !self.collection_ready(&collection, false).await? {
				return Ok(Vec::new());
			}

			let response = self
				.client
				.query(
					QueryPointsBuilder::new(collection)
						.query(query)
						.using(VECTOR_NAME)
						.with_payload(true)
						.with_vectors(request.include_vectors)
						.limit(request.top_k as u64),
				)
				.await?;

			Ok(response
				.result
				.into_iter()
				.filter_map(|point| {
					let id = payload_string(&point.payload, PAYLOAD_ID)?;

					Some(ScoredRecord {
						id,
						score: self.similarity.normalize(point.score as f64),
						vector: dense_vector(point.vectors),
						metadata: if request.include_metadata {
							payload_metadata(&point.payload)
						} else {
							None
						},
						data: payload_string(&point.payload, PAYLOAD_DATA),
					})
				})
				.collect())
		})
	}

	fn fetch<'a>(
		&'a self,
		namespace: &'a str,
		ids: &'a [String],
		options: FetchOptions,
	) -> BoxFuture<'a, Result<Vec<Option<Record>>>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if ids.is_empty() || !self.collection_ready(&collection, false).await? {
				return Ok(vec![None; ids.len()]);
			}

			let mut found: HashMap<String, Record> = self
				.get(&collection, ids, options.include_vectors)
				.await?
				.into_iter()
				.filter_map(|point| to_record(point, options))
				.map(|record| (record.id.clone(), record))
				.collect();

			Ok(ids.iter().map(|id| found.remove(id)).collect())
		})
	}

	fn delete<'a>(&'a self, namespace: &'a str, ids: &'a [String]) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if ids.is_empty() || !self.collection_ready(&collection, false).await? {
				return Ok(0);
			}

			let existing = self.get(&collection, ids, false).await?;
			let point_ids: Vec<PointId> = existing.into_iter().filter_map(|point| point.id).collect();
			let deleted = point_ids.len();

			if deleted > 0 {
				self.client
					.delete_points(
						DeletePointsBuilder::new(collection)
							.points(PointsIdsList { ids: point_ids })
							.wait(true),
					)
					.await?;
			}

			Ok(deleted)
		})
	}

	fn update<'a>(
		&'a self,
		namespace: &'a str,
		request: UpdateRequest,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if !self.collection_ready(&collection, false).await? {
				return Ok(false);
			}

			let ids = [request.id.clone()];
			let Some(mut current) = self
				.get(&collection, &ids, true)
				.await?
				.into_iter()
				.find_map(|point| to_record(point, FetchOptions::everything()))
			else {
				return Ok(false);
			};

			if let Some(vector) = request.vector {
				current.vector = Some(vector);
			}
			if request.metadata.is_some() {
				current.metadata = record::merge_metadata(current.metadata.take(), request.metadata);
			}

			let point = self.point(current)?;

			self.client
				.upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
				.await?;

			Ok(true)
		})
	}

	fn range<'a>(
		&'a self,
		namespace: &'a str,
		request: RangeRequest,
	) -> BoxFuture<'a, Result<RangePage>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if !self.collection_ready(&collection, false).await? {
				return Ok(RangePage::default());
			}

			let mut scroll = ScrollPointsBuilder::new(collection)
				.limit(request.limit as u32)
				.with_payload(true)
				.with_vectors(request.include_vectors);

			if let Some(cursor) = request.cursor {
				scroll = scroll.offset(PointId::from(cursor));
			}

			let response = self.client.scroll(scroll).await?;
			let options = FetchOptions {
				include_vectors: request.include_vectors,
				include_metadata: request.include_metadata,
				include_data: true,
			};

			Ok(RangePage {
				items: response
					.result
					.into_iter()
					.filter_map(|point| to_record(point, options))
					.collect(),
				next_cursor: response.next_page_offset.as_ref().and_then(point_id_string),
			})
		})
	}

	fn reset<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if self.client.collection_exists(collection.clone()).await? {
				self.client.delete_collection(collection.clone()).await?;
			}

			self.forget(&collection);
			self.collection_ready(&collection, true).await?;

			Ok(())
		})
	}

	fn delete_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let collection = self.collection_name(namespace);

			if self.client.collection_exists(collection.clone()).await? {
				self.client.delete_collection(collection.clone()).await?;
			}

			self.forget(&collection);

			Ok(())
		})
	}

	fn info<'a>(&'a self) -> BoxFuture<'a, Result<IndexInfo>> {
		Box::pin(async move {
			let mut namespaces = BTreeMap::new();

			for collection in self.client.list_collections().await?.collections {
				let Some(namespace) = self.namespace_of(&collection.name) else {
					continue;
				};
				let count = self
					.client
					.collection_info(collection.name.clone())
					.await?
					.result
					.and_then(|info| info.points_count)
					.unwrap_or(0);

				namespaces.insert(namespace, count as usize);
			}

			Ok(IndexInfo {
				dimension: self.vector_dim as usize,
				similarity: self.similarity,
				namespaces,
			})
		})
	}

	fn list_namespaces<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let mut namespaces: Vec<String> = self
				.client
				.list_collections()
				.await?
				.collections
				.into_iter()
				.filter_map(|collection| self.namespace_of(&collection.name))
				.collect();

			namespaces.sort();

			Ok(namespaces)
		})
	}
}

pub fn parse_distance(name: &str) -> Result<(Distance, Similarity)> {
	match name {
		"cosine" => Ok((Distance::Cosine, Similarity::Cosine)),
		"euclid" => Ok((Distance::Euclid, Similarity::Euclidean)),
		"dot" => Ok((Distance::Dot, Similarity::DotProduct)),
		other => Err(Error::InvalidArgument(format!("Unknown distance {other:?}."))),
	}
}

/// Stable point id for a string record id.
pub fn point_id(id: &str) -> String {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn payload(
	id: &str,
	metadata: Option<&Metadata>,
	data: Option<&str>,
) -> Result<HashMap<String, Value>> {
	let mut map = HashMap::new();

	map.insert(PAYLOAD_ID.to_string(), Value::from(id.to_string()));

	if let Some(metadata) = metadata {
		map.insert(PAYLOAD_METADATA.to_string(), Value::from(serde_json::to_string(metadata)?));
	}
	if let Some(data) = data {
		map.insert(PAYLOAD_DATA.to_string(), Value::from(data.to_string()));
	}

	Ok(map)
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_metadata(payload: &HashMap<String, Value>) -> Option<Metadata> {
	let raw = payload_string(payload, PAYLOAD_METADATA)?;

	match serde_json::from_str(&raw) {
		Ok(metadata) => Some(metadata),
		Err(err) => {
			tracing::warn!(error = %err, "Dropping unreadable metadata payload.");

			None
		},
	}
}

fn to_record(point: RetrievedPoint, options: FetchOptions) -> Option<Record> {
	let id = payload_string(&point.payload, PAYLOAD_ID)?;

	Some(Record {
		id,
		vector: if options.include_vectors { dense_vector(point.vectors) } else { None },
		data: if options.include_data { payload_string(&point.payload, PAYLOAD_DATA) } else { None },
		metadata: if options.include_metadata { payload_metadata(&point.payload) } else { None },
	})
}

fn dense_vector(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
	let output = match vectors?.vectors_options? {
		VectorsOptions::Vector(output) => output,
		VectorsOptions::Vectors(mut named) => named.vectors.remove(VECTOR_NAME)?,
	};

	Some(vector_data(output))
}

#[allow(deprecated)]
fn vector_data(output: VectorOutput) -> Vec<f32> {
	match output.vector {
		Some(vector_output::Vector::Dense(dense)) => dense.data,
		_ => output.data,
	}
}

fn point_id_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(num)) => Some(num.to_string()),
		None => None,
	}
}
