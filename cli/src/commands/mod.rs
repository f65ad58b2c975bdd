//! Command implementations

pub mod bake;
