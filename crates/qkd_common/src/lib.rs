//! Shared types for the QKD bridge workspace.
//!
//! Holds the wire/data model exchanged between the bridge daemon and the
//! planner service, the hardware safety limits with their clamping rules,
//! and the channel-physics formula library.

pub mod channel;
pub mod error;
pub mod rpc;
pub mod safety;
pub mod types;

pub use error::{BridgeError, Result};
pub use safety::{clamp, Constraints, SafetyLimits};
pub use types::{
    ClockModel, DecoyProfile, Domain, DomainPolicy, PhaseOverrides, Plan, PlanRequest, Slo,
    SloClass, Telemetry, TxOverrides,
};
