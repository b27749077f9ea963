pub mod merge;
pub mod partition;

mod error;
mod scoped;
mod sharded;

pub use error::{Error, Result};
pub use scoped::ScopedIndex;
pub use sharded::{Layout, ShardedIndex};
