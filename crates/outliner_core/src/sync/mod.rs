//! Store change notification plumbing.
//!
//! # Responsibility
//! - Publish store revision changes to subscribers.
//! - Guard consumers against out-of-order or repeated notifications.

pub mod invalidation;
