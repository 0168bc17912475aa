//! Session/credential lifecycle: stores, failover, rotation, sweep.

pub mod failover;
pub mod memory;
pub mod service;
pub mod store;
pub mod sweeper;
