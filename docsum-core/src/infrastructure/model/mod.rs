//! Model infrastructure module
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - the `ModelClient` seam the runner talks to
//! - `adapter` - conversion to the OpenAI wire format
//! - `clients` - HTTP client implementations

pub mod adapter;
pub mod clients;
pub mod traits;
pub mod types;

pub use clients::OpenAIClient;
pub use traits::ModelClient;
pub use types::{ModelError, ModelRequest, ModelResponse};
