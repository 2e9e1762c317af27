//! Background Tasks Module
//!
//! Periodic maintenance that runs alongside the server.
//!
//! # Tasks
//! - Cleanup: sweeps expired entries out of the in-process fallback store
//! - Reconnect: probes a dropped durable backend until it answers again

mod cleanup;
mod reconnect;

pub use cleanup::spawn_cleanup_task;
pub use reconnect::spawn_reconnect_task;
