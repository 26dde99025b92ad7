//! Core Module
//!
//! Infraestrutura comum do crate: macros de log e o sink onde elas escrevem.

pub mod debug;
pub mod logging;
