pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The store's dimension and similarity are not known yet.
	#[error("Vector index is not ready.")]
	NotReady,
	/// Calls that succeeded are not rolled back.
	#[error("{operation} failed on {failed} of {total} partitions: {message}")]
	PartialFailure { operation: &'static str, failed: usize, total: usize, message: String },
	#[error(transparent)]
	Storage(#[from] tessera_storage::Error),
}
