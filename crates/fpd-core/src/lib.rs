//! fpd-core - Core traits and types for fingerprint session services
//!
//! This crate provides the vocabulary shared between the session engine and
//! whatever sits on either side of it: the status taxonomy reported to
//! callers, auth tokens, sensor properties, the caller callback contract and
//! the failure-accounting contract consumed by lockout handling.

pub mod callback;
pub mod lockout;
pub mod models;

pub use callback::{ChannelCallback, SessionCallback, SessionEvent};
pub use lockout::{LockoutMode, LockoutTracker};
pub use models::*;
