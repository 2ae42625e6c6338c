//! Core use-case services.
//!
//! # Responsibility
//! - Turn occurrence-addressed requests into store mutations.
//! - Own the per-session navigation state machine.
//! - Join store invalidations and navigation into one session object.

pub mod navigation;
pub mod notes_service;
pub mod session;
