//! Channel-physics formula library.
//!
//! Closed-form link-budget helpers for the three channel families the bridge
//! cares about: optical fibre, free-space beams, and superconducting-optical
//! transduction. Inputs are validated and rejected with
//! [`BridgeError::InvalidArgument`](crate::error::BridgeError) so implausible
//! scenarios fail loudly instead of propagating NaNs. Not called by the
//! control loop.

pub mod fiber;
pub mod freespace;
pub mod transduction;
