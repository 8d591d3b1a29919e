//! Shared data model for the optimization pipeline.
//!
//! Policies, demands and request info come in from the caller; the
//! constraint request goes out to the Solver Service; plan envelopes come back
//! and are turned into a solution envelope.

pub mod demand;
pub mod policy;
pub mod request;
pub mod serde_helpers;
pub mod solution;
pub mod solver;

pub use demand::*;
pub use policy::*;
pub use request::*;
pub use solution::*;
pub use solver::*;
