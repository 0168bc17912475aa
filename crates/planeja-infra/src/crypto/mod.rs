//! Password hashing and token signing.

pub mod password;
pub mod token;
