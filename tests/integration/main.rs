//! Integration tests driving full reconcile passes against `MemoryStore`.
//!
//! Each submodule tests a specific area of concern. The shared harness and
//! helpers live in `common.rs`.
//!
//! Run with: `cargo test --test integration`

mod common;

mod child_resources;
mod failures;
mod idempotence;
mod missing_image;
mod scaling;
