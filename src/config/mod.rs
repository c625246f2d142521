//! # Configuration Module
//!
//! This module provides the application configuration and its validation.

pub mod config;

pub use config::{AppConfig, Backend, CloudConfig, FeedConfig, LocalConfig, SessionSettings};
