//! Thin seams over `std` used by the farmbot panel crates.
//!
//! | Concern | Trait(s) | Production | Test |
//! |---------|----------|------------|------|
//! | Env vars | [`ReadEnv`] | [`SystemEnv`] | [`InMemoryEnv`]* |
//! | Filesystem | [`ReadFile`], [`WriteFile`], [`RenameFile`], [`RemoveFile`], [`CreateDirAll`] | [`SystemFs`] | [`MemFs`]* |
//!
//! *Available with `#[cfg(test)]` or the `"test-support"` feature.
//!
//! [`SystemEnv`] and [`SystemFs`] are zero-sized. [`MemFs`] is a cheap
//! `Clone` handle over shared storage and is `Send + Sync`, so it can sit
//! inside axum state. [`InMemoryEnv`] is `RefCell` backed and single-threaded.

pub mod env;
pub mod fs;

pub use env::{ReadEnv, SystemEnv};
pub use fs::{CreateDirAll, ReadFile, RemoveFile, RenameFile, SystemFs, WriteFile};

#[cfg(any(test, feature = "test-support"))]
pub use env::InMemoryEnv;
#[cfg(any(test, feature = "test-support"))]
pub use fs::MemFs;
