//! # stockade-runtime
//!
//! Container lifecycle for the Stockade runtime.
//!
//! - [`launch`]: builds the root, clones the init, and releases it once the
//!   cgroup and ID maps are in place.
//! - [`init`]: the state machine the cloned child runs as PID 1.
//! - [`join`]: attaches the calling process to a running container.
//! - [`manager`] and [`state`]: persisted records and the operator-facing
//!   commands built on them.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod init;
pub mod join;
pub mod launch;
pub mod manager;
pub mod metrics;
pub mod spawn;
pub mod state;
