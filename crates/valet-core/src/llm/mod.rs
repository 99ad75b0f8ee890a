//! Model backend contract.

mod backend;

pub use backend::{ModelBackend, ModelStream, ModelStreamHandle};
