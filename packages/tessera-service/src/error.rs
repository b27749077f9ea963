pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Search method is not ready.")]
	NotReady,
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}

impl From<tessera_storage::Error> for Error {
	fn from(err: tessera_storage::Error) -> Self {
		match err {
			tessera_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			tessera_storage::Error::DimensionMismatch { .. } =>
				Self::InvalidRequest { message: err.to_string() },
			tessera_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<tessera_index::Error> for Error {
	fn from(err: tessera_index::Error) -> Self {
		match err {
			tessera_index::Error::NotReady => Self::NotReady,
			tessera_index::Error::Storage(inner) => inner.into(),
			partial @ tessera_index::Error::PartialFailure { .. } =>
				Self::Storage { message: partial.to_string() },
		}
	}
}

impl From<tessera_bm25::Error> for Error {
	fn from(err: tessera_bm25::Error) -> Self {
		match err {
			tessera_bm25::Error::Index(inner) => inner.into(),
			tessera_bm25::Error::Storage(inner) => inner.into(),
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<tessera_providers::Error> for Error {
	fn from(err: tessera_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
