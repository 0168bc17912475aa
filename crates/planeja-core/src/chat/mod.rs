pub mod broker;
pub mod failover;
pub mod memory;
pub mod service;
pub mod store;
