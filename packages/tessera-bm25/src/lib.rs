pub mod keys;

mod engine;
mod error;

pub use engine::Bm25Engine;
pub use error::{Error, Result};
