//! Optimization workflows.
//!
//! Each workflow turns a northbound request into demands, then runs the shared
//! pipeline in [`OptimizationEngine`]. Requests run in parallel on a bounded
//! [`WorkerPool`]; a single request is processed strictly sequentially.

pub mod engine;
pub mod error;
pub mod pool;
pub mod workflows;

pub use engine::{EngineBuilder, OptimizationEngine, SliceSelection};
pub use error::WorkflowError;
pub use pool::WorkerPool;
pub use workflows::{Workflow, WorkflowInput};
