//! Reconciliation policy and review sort keys.

pub mod v1;
pub mod ordering;

pub use v1::{ReconcilePolicyV1, ReferenceKinds};
pub use ordering::{sort_by_name, sort_by_type_group, NameKey, TypeGroupKey};
