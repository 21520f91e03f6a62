//! Balance collection and alerting engine.
//!
//! This crate contains the partner router, the concurrent collector, spend
//! estimation and the low-balance report builder.

pub mod alert;
pub mod collector;
pub mod router;
pub mod service;
pub mod statistics;
pub mod store;

pub use alert::*;
pub use collector::*;
pub use router::*;
pub use service::*;
pub use statistics::*;
pub use store::*;
