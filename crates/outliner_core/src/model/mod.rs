//! Domain model for the note graph and its addressing scheme.
//!
//! # Responsibility
//! - Define the note read model and its opaque identifier.
//! - Define `Segment`/`Path`, which name one occurrence of a note inside the
//!   graph even when a parent lists the same child more than once.
//! - Provide the pure child-list algorithms shared by every store.
//!
//! # Invariants
//! - A note owns its child list; parent sets are always derived.
//! - Occurrence iterations are only meaningful against the child list they
//!   were derived from.

pub mod children;
pub mod note;
pub mod path;
