//! Repository layer over the key-value store.
//!
//! # Responsibility
//! - Define use-case oriented collection access.
//! - Isolate record encoding details from services.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateId`) in
//!   addition to storage failures.

pub mod collection_repo;
