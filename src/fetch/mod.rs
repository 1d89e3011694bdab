pub mod client;
pub mod paginate;
pub mod stub;

pub use client::*;
pub use paginate::*;
