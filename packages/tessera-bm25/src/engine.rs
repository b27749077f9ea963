use std::{
	collections::{HashMap, HashSet},
	slice,
	sync::{Arc, Mutex, MutexGuard},
};

use futures::future;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::{Error, Result, keys};
use tessera_domain::{
	AlphanumericTokenizer, Bm25Params, Document, DocumentTerms, DocumentUpdate, IndexStatistics,
	Metadata, NamespaceStatistics, RebuildPolicy, Record, ScoredRecord, TextQuery, Tokenizer,
	WordStatistic, bm25, record,
	stats::{
		DOCUMENTS_CONTAINING_WORD, INDEX_STATISTICS, INDEXED_NUMBER_OF_DOCUMENTS,
		INDEXED_TOTAL_DOCUMENT_LENGTH, NUMBER_OF_DOCUMENTS, NUMBER_OF_WORDS, TOTAL_DOCUMENT_LENGTH,
		WORD_STATISTICS,
	},
};
use tessera_index::ScopedIndex;
use tessera_storage::{Command, IndexInfo, MetadataStore, QueryRequest, Reply, Script, UpdateRequest};

const REINDEX_BATCH: usize = 256;

#[derive(Default)]
struct NamespaceState {
	defined: OnceCell<()>,
	/// Read-through mirror of the shared statistics record.
	statistics: Mutex<NamespaceStatistics>,
}
impl NamespaceState {
	fn statistics(&self) -> MutexGuard<'_, NamespaceStatistics> {
		self.statistics.lock().unwrap_or_else(|err| err.into_inner())
	}
}

/// Signed change to the statistics of one namespace.
struct TermDelta {
	documents: i64,
	length: i64,
	/// Change of each word's document count, in order of first appearance.
	words: Vec<(String, i64)>,
}
impl TermDelta {
	fn new<'a>(documents: impl IntoIterator<Item = &'a DocumentTerms>, sign: i64) -> Self {
		let mut delta = Self { documents: 0, length: 0, words: Vec::new() };
		let mut positions: HashMap<&'a str, usize> = HashMap::new();

		for terms in documents {
			delta.documents += sign;
			delta.length += sign * terms.length as i64;

			for word in terms.words() {
				match positions.get(word) {
					Some(&position) => delta.words[position].1 += sign,
					None => {
						positions.insert(word, delta.words.len());
						delta.words.push((word.to_string(), sign));
					},
				}
			}
		}

		delta
	}

	fn is_empty(&self) -> bool {
		self.documents == 0 && self.length == 0 && self.words.is_empty()
	}
}

/// Full-text search over a [`ScopedIndex`], with per-namespace term statistics kept in a shared
/// [`MetadataStore`].
///
/// Several engines, possibly in different processes, may share one metadata store. Namespace
/// creation and word index assignment are atomic there; counters move by atomic increments.
pub struct Bm25Engine {
	index: ScopedIndex,
	metadata: Arc<dyn MetadataStore>,
	tokenizer: Arc<dyn Tokenizer>,
	params: Bm25Params,
	policy: RebuildPolicy,
	namespaces: Mutex<HashMap<String, Arc<NamespaceState>>>,
}
impl Bm25Engine {
	pub fn new(index: ScopedIndex, metadata: Arc<dyn MetadataStore>) -> Self {
		Self {
			index,
			metadata,
			tokenizer: Arc::new(AlphanumericTokenizer),
			params: Bm25Params::default(),
			policy: RebuildPolicy::default(),
			namespaces: Mutex::new(HashMap::new()),
		}
	}

	pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
		self.tokenizer = tokenizer;

		self
	}

	pub fn with_params(mut self, params: Bm25Params) -> Self {
		self.params = params;

		self
	}

	pub fn with_policy(mut self, policy: RebuildPolicy) -> Self {
		self.policy = policy;

		self
	}

	pub fn index(&self) -> &ScopedIndex {
		&self.index
	}

	/// Indexes `documents`, replacing any stored document with the same id.
	pub async fn upsert(&self, namespace: &str, documents: Vec<Document>) -> Result<()> {
		let documents = dedupe(documents);

		if documents.is_empty() {
			return Ok(());
		}

		let state = self.define(namespace).await?;
		let ids: Vec<String> = documents.iter().map(|document| document.id.clone()).collect();
		let previous = self.existing_documents(namespace, &ids).await?;

		// Old contributions leave before new ones arrive, so re-upserts net out.
		if !previous.is_empty() {
			let terms: Vec<DocumentTerms> =
				previous.iter().map(|document| self.terms(&document.text)).collect();

			self.apply_delta(namespace, &state, TermDelta::new(&terms, -1)).await?;
		}

		let terms: Vec<DocumentTerms> =
			documents.iter().map(|document| self.terms(&document.text)).collect();

		self.apply_delta(namespace, &state, TermDelta::new(&terms, 1)).await?;
		self.rebuild_if_needed(namespace, &state, &ids.into_iter().collect()).await?;
		self.store_documents(namespace, &documents).await?;

		let records: Vec<Record> = {
			let statistics = state.statistics();

			documents
				.into_iter()
				.zip(&terms)
				.map(|(document, terms)| {
					Record::with_vector(
						document.id,
						bm25::document_vector(&statistics, terms, &self.params),
					)
					.metadata(document.metadata)
				})
				.collect()
		};

		tracing::debug!(
			namespace,
			documents = records.len(),
			replaced = previous.len(),
			"Upserting BM25 documents."
		);

		self.index.upsert(namespace, records).await?;

		Ok(())
	}

	/// Returns how many of `ids` were indexed.
	pub async fn delete(&self, namespace: &str, ids: &[String]) -> Result<usize> {
		if ids.is_empty() {
			return Ok(0);
		}

		let Some(state) = self.defined(namespace).await? else {
			return Ok(0);
		};
		let previous = self.existing_documents(namespace, ids).await?;

		if !previous.is_empty() {
			let terms: Vec<DocumentTerms> =
				previous.iter().map(|document| self.terms(&document.text)).collect();
			let removed: Vec<String> = previous.into_iter().map(|document| document.id).collect();

			self.apply_delta(namespace, &state, TermDelta::new(&terms, -1)).await?;
			self.metadata
				.pipeline(vec![
					Command::Del {
						keys: removed.iter().map(|id| keys::document(namespace, id)).collect(),
					},
					Command::SetRemove { key: keys::members(namespace), members: removed },
				])
				.await?;
			self.rebuild_if_needed(namespace, &state, &HashSet::new()).await?;
		}

		Ok(self.index.delete(namespace, ids).await?)
	}

	/// Returns whether the document existed.
	pub async fn update(&self, namespace: &str, update: DocumentUpdate) -> Result<bool> {
		match update {
			DocumentUpdate::Metadata { id, metadata } => {
				self.rewrite_metadata(namespace, &id, metadata.clone()).await?;

				Ok(self
					.index
					.update(namespace, UpdateRequest { id, vector: None, metadata: Some(metadata) })
					.await?)
			},
			DocumentUpdate::Text { id, text, metadata } =>
				self.update_text(namespace, id, text, metadata).await,
			DocumentUpdate::Vector { id, vector } => Ok(self
				.index
				.update(namespace, UpdateRequest { id, vector: Some(vector), metadata: None })
				.await?),
		}
	}

	/// Ranks documents by the BM25 weight of the query's distinct words.
	///
	/// Namespaces that were never written return nothing. Hits that share no word with the query
	/// are dropped.
	pub async fn query(&self, namespace: &str, query: &TextQuery) -> Result<Vec<ScoredRecord>> {
		let Some(state) = self.defined(namespace).await? else {
			return Ok(Vec::new());
		};
		let mut seen = HashSet::new();
		let words: Vec<String> = self
			.tokenizer
			.tokenize(&query.text)
			.into_iter()
			.filter(|word| seen.insert(word.clone()))
			.collect();

		if words.is_empty() {
			return Ok(Vec::new());
		}

		self.refresh_words(namespace, &state, &words).await?;

		let vector = bm25::query_vector(&state.statistics(), &words);

		if vector.iter().all(|value| *value == 0.0) {
			return Ok(Vec::new());
		}

		let layout = self.index.layout().await?;
		let request = QueryRequest::by_vector(vector, query.top_k)
			.include_vectors(query.include_vectors)
			.include_metadata(query.include_metadata);
		let hits = self.index.query(namespace, request).await?;

		Ok(match layout.similarity.no_match_score() {
			Some(sentinel) => hits.into_iter().filter(|hit| hit.score != sentinel).collect(),
			None => hits,
		})
	}

	pub async fn query_many(
		&self,
		namespace: &str,
		queries: &[TextQuery],
	) -> Result<Vec<Vec<ScoredRecord>>> {
		future::try_join_all(queries.iter().map(|query| self.query(namespace, query))).await
	}

	/// Freezes the live statistics as the baseline and re-vectorizes every stored document.
	pub async fn rebuild(&self, namespace: &str) -> Result<()> {
		let state = self.define(namespace).await?;

		self.rebuild_with(namespace, &state, &HashSet::new(), true).await
	}

	/// Drops every document and starts the namespace over from empty statistics.
	pub async fn reset(&self, namespace: &str) -> Result<()> {
		let removed = self.drop_documents(namespace, false).await?;

		*self.state(namespace).statistics() = NamespaceStatistics::default();

		self.index.reset(namespace).await?;

		tracing::info!(namespace, documents = removed, "Reset BM25 namespace.");

		Ok(())
	}

	pub async fn delete_namespace(&self, namespace: &str) -> Result<()> {
		let removed = self.drop_documents(namespace, true).await?;

		self.lock_namespaces().remove(namespace);
		self.index.delete_namespace(namespace).await?;

		tracing::info!(namespace, documents = removed, "Deleted BM25 namespace.");

		Ok(())
	}

	pub async fn info(&self) -> Result<IndexInfo> {
		Ok(self.index.info().await?)
	}

	pub async fn list_namespaces(&self) -> Result<Vec<String>> {
		Ok(self.index.list_namespaces().await?)
	}

	/// The shared statistics record, if the namespace was ever written.
	pub async fn statistics(&self, namespace: &str) -> Result<Option<NamespaceStatistics>> {
		let reply = self.metadata.execute(Command::json_get(keys::statistics(namespace), &[])).await?;

		match reply.into_json()? {
			Some(value) => Ok(Some(serde_json::from_value(value)?)),
			None => Ok(None),
		}
	}

	fn terms(&self, text: &str) -> DocumentTerms {
		DocumentTerms::from_tokens(self.tokenizer.tokenize(text))
	}

	fn lock_namespaces(&self) -> MutexGuard<'_, HashMap<String, Arc<NamespaceState>>> {
		self.namespaces.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn state(&self, namespace: &str) -> Arc<NamespaceState> {
		self.lock_namespaces().entry(namespace.to_string()).or_default().clone()
	}

	/// Creates the statistics record at most once and loads it into the local mirror.
	///
	/// Concurrent callers share one in-flight definition; other processes are fenced by the
	/// create-if-absent script.
	async fn define(&self, namespace: &str) -> Result<Arc<NamespaceState>> {
		let state = self.state(namespace);

		state
			.defined
			.get_or_try_init(|| async {
				let key = keys::statistics(namespace);
				let default = serde_json::to_value(NamespaceStatistics::default())?;
				let mut replies = self
					.metadata
					.pipeline(vec![
						Command::Script(Script::CreateIfAbsent { key: key.clone(), value: default }),
						Command::json_get(key, &[]),
					])
					.await?
					.into_iter();
				let created = next_reply(&mut replies)?.into_bool()?;
				let statistics = parse_statistics(namespace, next_reply(&mut replies)?)?;

				*state.statistics() = statistics;

				if created {
					tracing::info!(namespace, "Defined BM25 namespace.");
				}

				Ok::<_, Error>(())
			})
			.await?;

		Ok(state)
	}

	/// Like [`Self::define`] but never creates anything.
	async fn defined(&self, namespace: &str) -> Result<Option<Arc<NamespaceState>>> {
		let cached = self.lock_namespaces().get(namespace).cloned();

		if let Some(state) = cached
			&& state.defined.initialized()
		{
			return Ok(Some(state));
		}

		let exists = self
			.metadata
			.execute(Command::json_get(keys::statistics(namespace), &[NUMBER_OF_WORDS]))
			.await?
			.into_json()?
			.is_some();

		if !exists {
			return Ok(None);
		}

		self.define(namespace).await.map(Some)
	}

	/// Gives each word without a known index one, in order. The script returns the existing index
	/// when another writer got there first.
	async fn assign_indices(
		&self,
		namespace: &str,
		state: &NamespaceState,
		words: &[&str],
	) -> Result<()> {
		let missing: Vec<String> = {
			let statistics = state.statistics();

			words
				.iter()
				.filter(|word| statistics.word_index(word).is_none())
				.map(|word| word.to_string())
				.collect()
		};

		if missing.is_empty() {
			return Ok(());
		}

		let key = keys::statistics(namespace);
		let replies = self
			.metadata
			.pipeline(
				missing
					.iter()
					.map(|word| {
						Command::Script(Script::AssignWordIndex {
							key: key.clone(),
							word: word.clone(),
						})
					})
					.collect(),
			)
			.await?;

		if replies.len() < missing.len() {
			return Err(Error::MissingReply);
		}

		let assigned = missing.len();
		let mut statistics = state.statistics();

		for (word, reply) in missing.into_iter().zip(replies) {
			let index = reply.into_integer()?.max(0);

			statistics.word_statistics.entry(word).or_default().index = Some(index as u64);
			statistics.number_of_words = statistics.number_of_words.max(index + 1);
		}

		tracing::debug!(namespace, assigned, "Assigned word indices.");

		Ok(())
	}

	/// Applies `delta` with atomic increments and mirrors the resulting counters locally.
	async fn apply_delta(
		&self,
		namespace: &str,
		state: &NamespaceState,
		delta: TermDelta,
	) -> Result<()> {
		if delta.is_empty() {
			return Ok(());
		}

		let added: Vec<&str> =
			delta.words.iter().filter(|(_, by)| *by > 0).map(|(word, _)| word.as_str()).collect();

		self.assign_indices(namespace, state, &added).await?;

		let key = keys::statistics(namespace);
		let mut commands: Vec<Command> = delta
			.words
			.iter()
			.map(|(word, by)| {
				Command::json_incr(
					key.as_str(),
					&[WORD_STATISTICS, word.as_str(), DOCUMENTS_CONTAINING_WORD],
					*by,
				)
			})
			.collect();

		commands.push(Command::json_incr(
			key.as_str(),
			&[INDEX_STATISTICS, NUMBER_OF_DOCUMENTS],
			delta.documents,
		));
		commands.push(Command::json_incr(
			key.as_str(),
			&[INDEX_STATISTICS, TOTAL_DOCUMENT_LENGTH],
			delta.length,
		));
		commands.push(Command::json_get(key.as_str(), &[INDEX_STATISTICS]));

		let mut replies = self.metadata.pipeline(commands).await?.into_iter();
		let mut counts = Vec::with_capacity(delta.words.len());

		for _ in &delta.words {
			counts.push(next_reply(&mut replies)?.into_integer()?);
		}

		let index_statistics: IndexStatistics =
			match replies.last().map(Reply::into_json).transpose()?.flatten() {
				Some(value) => serde_json::from_value(value)?,
				None => return Err(Error::MissingStatistics { namespace: namespace.to_string() }),
			};
		let mut statistics = state.statistics();

		for ((word, _), count) in delta.words.into_iter().zip(counts) {
			statistics.word_statistics.entry(word).or_default().documents_containing_word = count;
		}

		statistics.index_statistics = index_statistics;

		Ok(())
	}

	/// Pulls the shared entries of words this process has not seen, plus the live counters.
	async fn refresh_words(
		&self,
		namespace: &str,
		state: &NamespaceState,
		words: &[String],
	) -> Result<()> {
		let unknown: Vec<&String> = {
			let statistics = state.statistics();

			words.iter().filter(|word| statistics.word_index(word).is_none()).collect()
		};
		let key = keys::statistics(namespace);
		let mut commands: Vec<Command> = unknown
			.iter()
			.map(|word| Command::json_get(key.as_str(), &[WORD_STATISTICS, word.as_str()]))
			.collect();

		commands.push(Command::json_get(key.as_str(), &[INDEX_STATISTICS]));
		commands.push(Command::json_get(key.as_str(), &[NUMBER_OF_WORDS]));

		let mut replies = self.metadata.pipeline(commands).await?.into_iter();
		let mut found = Vec::new();

		for word in unknown {
			if let Some(value) = next_reply(&mut replies)?.into_json()? {
				found.push((word.clone(), serde_json::from_value::<WordStatistic>(value)?));
			}
		}

		let index_statistics = next_reply(&mut replies)?
			.into_json()?
			.map(serde_json::from_value::<IndexStatistics>)
			.transpose()?;
		let number_of_words =
			next_reply(&mut replies)?.into_json()?.and_then(|value| value.as_i64());
		let mut statistics = state.statistics();

		statistics.word_statistics.extend(found);

		if let Some(index_statistics) = index_statistics {
			statistics.index_statistics = index_statistics;
		}
		if let Some(number_of_words) = number_of_words {
			statistics.number_of_words = statistics.number_of_words.max(number_of_words);
		}

		Ok(())
	}

	/// Returns whether a rebuild ran. The first population of a namespace only sets the baseline.
	async fn rebuild_if_needed(
		&self,
		namespace: &str,
		state: &NamespaceState,
		exclude: &HashSet<String>,
	) -> Result<bool> {
		let (needed, first) = {
			let statistics = state.statistics();

			(statistics.needs_rebuild(&self.policy), statistics.baseline_is_empty())
		};

		if !needed {
			return Ok(false);
		}

		self.rebuild_with(namespace, state, exclude, !first).await?;

		Ok(true)
	}

	async fn rebuild_with(
		&self,
		namespace: &str,
		state: &NamespaceState,
		exclude: &HashSet<String>,
		rescan: bool,
	) -> Result<()> {
		let key = keys::statistics(namespace);
		let reply = self.metadata.execute(Command::json_get(key.as_str(), &[])).await?;
		let mut statistics = parse_statistics(namespace, reply)?;

		if statistics.index_statistics.number_of_documents == 0 {
			*state.statistics() = statistics;

			return Ok(());
		}

		statistics.snapshot_baseline();

		let baseline = statistics.index_statistics.clone();

		self.metadata
			.pipeline(vec![
				Command::json_set(
					key.as_str(),
					&[INDEX_STATISTICS, INDEXED_NUMBER_OF_DOCUMENTS],
					Value::from(baseline.indexed_number_of_documents),
				),
				Command::json_set(
					key.as_str(),
					&[INDEX_STATISTICS, INDEXED_TOTAL_DOCUMENT_LENGTH],
					Value::from(baseline.indexed_total_document_length),
				),
			])
			.await?;

		*state.statistics() = statistics.clone();

		tracing::info!(
			namespace,
			documents = baseline.indexed_number_of_documents,
			total_length = baseline.indexed_total_document_length,
			rescan,
			"Rebuilt BM25 baseline."
		);

		if rescan {
			self.reindex(namespace, &statistics, exclude).await?;
		}

		Ok(())
	}

	/// Re-vectorizes every stored document outside `exclude` against `statistics`.
	async fn reindex(
		&self,
		namespace: &str,
		statistics: &NamespaceStatistics,
		exclude: &HashSet<String>,
	) -> Result<()> {
		let ids: Vec<String> = self
			.metadata
			.execute(Command::SetMembers { key: keys::members(namespace) })
			.await?
			.into_members()?
			.into_iter()
			.filter(|id| !exclude.contains(id))
			.collect();

		for chunk in ids.chunks(REINDEX_BATCH) {
			let records: Vec<Record> = self
				.load_documents(namespace, chunk)
				.await?
				.into_iter()
				.flatten()
				.map(|document| {
					let terms = self.terms(&document.text);

					Record::with_vector(
						document.id,
						bm25::document_vector(statistics, &terms, &self.params),
					)
					.metadata(document.metadata)
				})
				.collect();

			if !records.is_empty() {
				self.index.upsert(namespace, records).await?;
			}
		}

		tracing::info!(namespace, documents = ids.len(), "Re-indexed BM25 documents.");

		Ok(())
	}

	async fn update_text(
		&self,
		namespace: &str,
		id: String,
		text: String,
		metadata: Option<Metadata>,
	) -> Result<bool> {
		let Some(state) = self.defined(namespace).await? else {
			return Ok(false);
		};
		let Some(previous) = self.existing_documents(namespace, slice::from_ref(&id)).await?.pop()
		else {
			return Ok(false);
		};
		let old_terms = self.terms(&previous.text);
		let new_terms = self.terms(&text);

		self.apply_delta(namespace, &state, TermDelta::new([&old_terms], -1)).await?;
		self.apply_delta(namespace, &state, TermDelta::new([&new_terms], 1)).await?;
		self.rebuild_if_needed(namespace, &state, &HashSet::from([id.clone()])).await?;

		let document =
			Document { id, text, metadata: record::merge_metadata(previous.metadata, metadata) };

		self.store_documents(namespace, slice::from_ref(&document)).await?;

		let record = {
			let statistics = state.statistics();

			Record::with_vector(
				document.id,
				bm25::document_vector(&statistics, &new_terms, &self.params),
			)
			.metadata(document.metadata)
		};

		self.index.upsert(namespace, vec![record]).await?;

		Ok(true)
	}

	/// Keeps stored metadata in step so later re-scans carry it.
	async fn rewrite_metadata(&self, namespace: &str, id: &str, metadata: Metadata) -> Result<()> {
		let Some(mut document) =
			self.load_documents(namespace, &[id.to_string()]).await?.pop().flatten()
		else {
			return Ok(());
		};

		document.metadata = record::merge_metadata(document.metadata.take(), Some(metadata));

		self.metadata
			.execute(Command::json_set(
				keys::document(namespace, id),
				&[],
				serde_json::to_value(&document)?,
			))
			.await?;

		Ok(())
	}

	/// Stored documents for the members among `ids`.
	async fn existing_documents(&self, namespace: &str, ids: &[String]) -> Result<Vec<Document>> {
		let flags = self
			.metadata
			.execute(Command::SetIsMember { key: keys::members(namespace), members: ids.to_vec() })
			.await?
			.into_bools()?;
		let existing: Vec<String> =
			ids.iter().zip(flags).filter(|(_, member)| *member).map(|(id, _)| id.clone()).collect();

		Ok(self.load_documents(namespace, &existing).await?.into_iter().flatten().collect())
	}

	async fn load_documents(&self, namespace: &str, ids: &[String]) -> Result<Vec<Option<Document>>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let commands =
			ids.iter().map(|id| Command::json_get(keys::document(namespace, id), &[])).collect();

		self.metadata
			.pipeline(commands)
			.await?
			.into_iter()
			.map(|reply| -> Result<Option<Document>> {
				match reply.into_json()? {
					Some(value) => Ok(Some(serde_json::from_value(value)?)),
					None => Ok(None),
				}
			})
			.collect()
	}

	async fn store_documents(&self, namespace: &str, documents: &[Document]) -> Result<()> {
		let mut commands = Vec::with_capacity(documents.len() + 1);

		for document in documents {
			commands.push(Command::json_set(
				keys::document(namespace, &document.id),
				&[],
				serde_json::to_value(document)?,
			));
		}

		commands.push(Command::SetAdd {
			key: keys::members(namespace),
			members: documents.iter().map(|document| document.id.clone()).collect(),
		});

		self.metadata.pipeline(commands).await?;

		Ok(())
	}

	/// Deletes stored documents and the membership set, plus the statistics record when
	/// `statistics` is set; otherwise the record is reset to its default. Returns the number of
	/// documents removed.
	async fn drop_documents(&self, namespace: &str, statistics: bool) -> Result<usize> {
		let members = self
			.metadata
			.execute(Command::SetMembers { key: keys::members(namespace) })
			.await?
			.into_members()?;
		let mut doomed: Vec<String> = members.iter().map(|id| keys::document(namespace, id)).collect();

		doomed.push(keys::members(namespace));

		let last = if statistics {
			doomed.push(keys::statistics(namespace));

			None
		} else {
			Some(Command::json_set(
				keys::statistics(namespace),
				&[],
				serde_json::to_value(NamespaceStatistics::default())?,
			))
		};
		let mut commands = vec![Command::Del { keys: doomed }];

		commands.extend(last);

		self.metadata.pipeline(commands).await?;

		Ok(members.len())
	}
}

/// Keeps the last document per id, at the position where the id first appeared.
fn dedupe(documents: Vec<Document>) -> Vec<Document> {
	let mut positions: HashMap<String, usize> = HashMap::new();
	let mut out: Vec<Document> = Vec::with_capacity(documents.len());

	for document in documents {
		match positions.get(&document.id) {
			Some(&position) => out[position] = document,
			None => {
				positions.insert(document.id.clone(), out.len());
				out.push(document);
			},
		}
	}

	out
}

fn next_reply(replies: &mut impl Iterator<Item = Reply>) -> Result<Reply> {
	replies.next().ok_or(Error::MissingReply)
}

fn parse_statistics(namespace: &str, reply: Reply) -> Result<NamespaceStatistics> {
	let value = reply
		.into_json()?
		.ok_or_else(|| Error::MissingStatistics { namespace: namespace.to_string() })?;

	Ok(serde_json::from_value(value)?)
}
