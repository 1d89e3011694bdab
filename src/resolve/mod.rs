pub mod chain;
pub mod entity;
pub mod source;

pub use chain::{flatten_chain, resolve_chain, ChainCache};
pub use entity::EntityResolver;
