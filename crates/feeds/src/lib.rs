//! Balance fetching from partner APIs.
//!
//! ## Architecture
//!
//! - `adapter/` - One adapter per upstream API shape, all behind [`BalanceAdapter`]
//! - `rest` - Shared HTTP request/response handling (timeout, status, parsing)
//! - `error` - [`FetchError`]

pub mod adapter;
pub mod error;
pub mod rest;

pub use adapter::{
    AdapterKind, AdapterSettings, BalanceAdapter, FeedStatsAdapter, FinanceBalanceAdapter,
    ItemBalanceAdapter, MockBalanceAdapter,
};
pub use error::*;
pub use rest::*;
