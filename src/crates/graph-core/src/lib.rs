//! Core pipeline execution engine for vault workflows.
//!
//! This crate contains the in-process half of the orchestration system: the
//! pipeline state threaded through nodes, the file-change values nodes
//! produce, the node capability contract, the graph plan, and the sequential
//! executor that drives a plan to a terminal result.
//!
//! The engine is deliberately free of I/O and persistence. Durable workflow
//! records, queues, and HTTP live in the service crate; external services
//! (LLM, research, draft gateway) are reached from node implementations via
//! client traits. Everything here operates on owned, per-run state, so any
//! number of pipelines may run concurrently without shared mutable state.
//!
//! # Example
//!
//! ```rust,ignore
//! use graph_core::{GraphPlan, NodeRegistry, PipelineExecutor, PipelineInputs};
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(my_node);
//!
//! let plan = GraphPlan::new(vec!["my_node".into()], "research_proposal");
//! let executor = PipelineExecutor::new(registry);
//! let result = executor.run(&plan, PipelineInputs::default(), None).await?;
//! assert!(result.success);
//! ```

pub mod change;
pub mod error;
pub mod executor;
pub mod node;
pub mod plan;
pub mod state;

pub use change::FileChange;
pub use error::{GraphError, Result};
pub use executor::{PipelineExecutor, PipelineInputs, ProgressCallback, WorkflowResult};
pub use node::{Node, NodeResult};
pub use plan::{GraphPlan, NodeRegistry};
pub use state::{NodeRecord, PipelineState};
