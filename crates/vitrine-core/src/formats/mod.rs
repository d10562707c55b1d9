//! # Formats Module
//!
//! Persisted representations of the capture policy and capture memory.
//!
//! Reading is tolerant: every field is normalized on its own and replaced by
//! its default when it is missing or malformed. Writing is strict JSON.

pub mod persistence;

pub use persistence::{decode_meta, decode_policy, encode_meta, encode_policy};
