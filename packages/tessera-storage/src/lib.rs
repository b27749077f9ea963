pub mod db;
pub mod memory;
pub mod metadata;
pub mod qdrant;
pub mod vector;

mod error;
mod postgres;

pub use error::Error;
pub use metadata::{Command, MetadataStore, Reply, Script};
pub use vector::{
	FetchOptions, IndexInfo, QueryRequest, RangePage, RangeRequest, UpdateRequest, VectorStore,
};

use std::{future::Future, pin::Pin};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
