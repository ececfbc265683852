//! Parish CMS - REST backend and admin tooling for a parish website
//!
//! This crate provides the server and admin client behind the `parish` CLI.
//!
//! # Architecture
//!
//! - [`api`] - axum REST API, one route group per content type
//! - [`client`] - admin clients (HTTP and in-process)
//! - [`intentions`] - monthly Mass intentions edit session
//! - [`poll`] - cancellable periodic tasks
//! - [`model`] - Data types (IntentionMonth, Announcement, ContactMessage, ...)
//! - [`storage`] - SQLite database layer and upgrade steps
//! - [`validate`] - Input validation and sanitization
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod intentions;
pub mod model;
pub mod poll;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
