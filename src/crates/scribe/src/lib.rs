//! Scribe — workflow orchestration service for vault article drafts.
//!
//! Accepts natural-language prompts that request an article draft for a
//! knowledge vault, runs a multi-stage pipeline (topic proposal, deep
//! research, draft-branch submission), and tracks every invocation as a
//! durable workflow record with a lifecycle, progress telemetry, and a
//! terminal outcome.
//!
//! Module map:
//!
//! - [`config`] — environment-driven settings
//! - [`db`] — SQLite connection and migrations
//! - [`workflow`] — durable record model and the status state machine
//! - [`registry`] — sole custodian of workflow records
//! - [`graphs`] — workflow-type catalog mapping types to node graphs
//! - [`nodes`] — the article-proposal node implementations
//! - [`vault`] — local vault summary service
//! - [`runner`] — drives one record through the pipeline to a terminal state
//! - [`queue`] — in-process task queue and async worker
//! - [`dispatch`] — entry point creating records and routing sync/async
//! - [`api`] — axum HTTP surface

pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod graphs;
pub mod nodes;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod vault;
pub mod workflow;

pub use config::Settings;
pub use db::Database;
pub use dispatch::{DispatchOutcome, Dispatcher, RunRequest};
pub use error::{Result, ScribeError};
pub use graphs::GraphCatalog;
pub use queue::{TaskQueue, Worker, WorkflowTask};
pub use registry::WorkflowRegistry;
pub use runner::PipelineRunner;
pub use workflow::{WorkflowRecord, WorkflowStatus};
