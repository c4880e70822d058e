//! Domain entity shapes for the persisted life-management domains.
//!
//! # Responsibility
//! - Define typed entities for domains with engine-enforced invariants
//!   (habits, tasks, goals, settings).
//! - Keep every other domain as untyped JSON records so stored data is kept
//!   verbatim.
//!
//! # Invariants
//! - Every entity is identified by an opaque, immutable string `id`.
//! - Unknown fields survive load/save through `extra` maps.

pub mod date_key;
pub mod entity;
pub mod goal;
pub mod habit;
pub mod record;
pub mod settings;
pub mod task;
