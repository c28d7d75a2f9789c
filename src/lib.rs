//! iva-ofe: intraday volume anomaly and options flow confirmation engine
//!
//! This library provides the core components for:
//! - Intraday price/volume bars from Yahoo Finance
//! - Rolling z-score volume anomaly detection
//! - Live NSE option chains and confirmation scoring (0-5)
//! - Best-of signal selection across a session's anomalies
//! - Parquet storage and real-time flow collection
//! - Structured logging and Prometheus metrics

pub mod anomaly;
pub mod cli;
pub mod collector;
pub mod config;
pub mod data;
pub mod feed;
pub mod options;
pub mod signal;
pub mod telemetry;
