//! Infrastructure implementations for the Planeja backend.
//!
//! SQLite repositories (WAL mode, split reader/writer pools), Argon2
//! password hashing, HMAC access-token signing, environment configuration,
//! and the Gemini streaming generator adapter.

pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
