//! Unit tests for amibake CLI
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod architecture;
mod mocks;
