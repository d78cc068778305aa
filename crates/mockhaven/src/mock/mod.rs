//! Ajax mocking: payload generation, scripted payloads, and the route table.

pub mod generate;
pub mod responder;
pub mod script;

pub use responder::MockRouter;
pub use script::{MockScript, ScriptRequest};
