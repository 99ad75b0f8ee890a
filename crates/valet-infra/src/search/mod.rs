//! HTTP clients for the read-only search and social APIs.

mod brave;
mod reddit;

pub use brave::BraveSearchClient;
pub use reddit::RedditClient;
