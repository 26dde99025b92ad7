//! # Page Reclaim Subsystem
//!
//! Políticas de substituição, aging dos contadores e eviction para swap.

pub mod aging;
pub mod evict;
pub mod policy;

pub use aging::age_tick;
pub use evict::evict_page;
pub use policy::{ReplacementPolicy, VictimSelector};
