//! External collaborator contracts
//!
//! Text generation, document retrieval, and live search live behind traits;
//! the engine never talks to a provider directly.

pub mod client;
mod error;
mod openai;
mod types;

pub use client::{DocumentIndex, LiveSearch, NullIndex, NullSearch, TextGenerator};
pub use error::BackendError;
pub use openai::OpenAIGenerator;
pub use types::{RetrievedDocument, SearchHit};
