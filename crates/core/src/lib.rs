//! Core data types for partner balance monitoring.

pub mod balance;
pub mod networks;
pub mod partner;
pub mod report;

pub use balance::*;
pub use networks::*;
pub use partner::*;
pub use report::*;
