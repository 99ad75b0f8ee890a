//! Filesystem-backed stores.

mod persona;

pub use persona::FsPersonaStore;
