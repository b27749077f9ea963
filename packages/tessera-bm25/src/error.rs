pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Index(#[from] tessera_index::Error),
	#[error(transparent)]
	Storage(#[from] tessera_storage::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error("Namespace {namespace:?} has no BM25 statistics.")]
	MissingStatistics { namespace: String },
	#[error("Metadata pipeline returned fewer replies than commands.")]
	MissingReply,
}
impl Error {
	pub fn is_not_ready(&self) -> bool {
		matches!(self, Self::Index(tessera_index::Error::NotReady))
	}
}
