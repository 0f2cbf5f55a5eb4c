//! Core domain types and logic.

pub mod bar_series;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod execution;
pub mod exit;
pub mod feed;
pub mod indicator;
pub mod ledger;
pub mod metrics;
pub mod ohlcv;
pub mod order;
pub mod position;
pub mod position_manager;
pub mod risk;
pub mod session;
pub mod signal;
