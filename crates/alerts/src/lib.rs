//! Persistence and Telegram delivery for balance reports.
//!
//! This crate provides:
//! - SQLite-backed balance history
//! - Telegram bot commands and report delivery
//! - Chat thread configuration

pub mod config;
pub mod db;
pub mod notifier;
pub mod telegram;

pub use config::{ChatThread, ThreadsConfig, ThreadsConfigError};
pub use db::{Database, DbError};
pub use notifier::{DeliveryStats, Notifier};
pub use telegram::{has_content, Command, ReportSink, TelegramBot, TelegramError};
