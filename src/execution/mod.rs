//! Workflow Execution Module
//!
//! Runs workflow definitions step by step and hands dispatchable steps to
//! the message router.
//!
//! # Architecture
//!
//! - [`engine`]: Public entry point that creates and finishes instances
//! - [`interpreter`]: Sequential step walk and condition evaluation
//! - [`service`]: Executes stored definitions and persists the instances

pub mod engine;
pub mod interpreter;
pub mod service;

pub use engine::{EngineConfig, WorkflowEngine, DEFAULT_STARTED_BY};
pub use interpreter::{evaluate_condition, Interpreter};
pub use service::WorkflowService;
