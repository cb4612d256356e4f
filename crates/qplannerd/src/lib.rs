//! Reference planner service.
//!
//! Hosts the tiered planning heuristic behind the planner RPC surface so a
//! bridge can be exercised without a full planning engine.

pub mod planner;
pub mod routes;
pub mod server;
