//! Chess primitives and the move representation built on top of them.

pub mod core;
pub mod moves;
