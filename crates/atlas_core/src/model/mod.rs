//! Domain model for publications.
//!
//! # Responsibility
//! - Define the canonical, source-independent publication record.
//!
//! # Invariants
//! - Every publication is keyed by a non-empty identifier string.
//! - Records are immutable once validated.

pub mod publication;
