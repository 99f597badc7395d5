//! om-core: stable foundation for omsim.
//!
//! Contains:
//! - ids (validated model identifiers, workspace ids)
//! - request (simulation request + setup parameters)
//! - report (failure taxonomy shared by every stage)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod report;
pub mod request;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use report::{ErrorCategory, ErrorReport};
pub use request::{SimulationRequest, SimulationSetup};
