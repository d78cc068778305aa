//! Request routing: table construction and per-request decisions.

pub mod decision;
pub mod tables;

pub use decision::{RoutePlanner, RoutingDecision};
pub use tables::{normalize, AjaxMockTable, FileProxyTable, MockRule};
