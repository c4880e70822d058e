//! Flutter-facing bindings for LazyLife core.

pub mod api;
