//! QKD bridge daemon library.
//!
//! Bridges a transceiver controller with a pluggable planner service and
//! runs the closed control loop: poll telemetry, request a cycle plan,
//! clamp it to the configured safety limits, apply it, repeat.

pub mod client;
pub mod config;
pub mod domain_policy;
pub mod enforcer;
pub mod runtime;
pub mod translator;
