//! Business logic and repository trait definitions for the Planeja backend.
//!
//! This crate defines the "ports" (store traits) that the infrastructure
//! layer implements, the in-memory fallback stores, the durable-to-memory
//! failover wrappers, the session manager, the expiry sweeper, and the
//! stream broker. It depends only on `planeja-types` -- never on
//! `planeja-infra` or any database/HTTP crate.

pub mod auth;
pub mod chat;
pub mod failover;
pub mod llm;
