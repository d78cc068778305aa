// Library exports for integration tests and embedding.

pub mod config;
pub mod mock;
pub mod routing;
pub mod server;
pub mod wildcard;
