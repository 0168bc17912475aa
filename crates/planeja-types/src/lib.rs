//! Shared domain types for the Planeja backend.
//!
//! This crate contains the types used across the platform: refresh
//! credentials, conversations and messages, subjects, configuration, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
