//! Core domain types and logic.

pub mod transaction;
pub mod ledger;
pub mod price;
pub mod aggregate;
pub mod rules;
pub mod applier;
pub mod backtest;
pub mod report;
pub mod warning;
pub mod config_validation;
pub mod error;
