//! Credential primitives: password hashing and signed bearer tokens.
//!
//! Both are thin wrappers over standard building blocks (`sha2`,
//! `hkdf`, `ed25519-dalek`); nothing here knows about accounts beyond their id.

mod password;
mod token;

pub use password::*;
pub use token::*;
