//! Environment variable access.
//!
//! ```
//! use farmbot_std::env::{ReadEnv, SystemEnv};
//!
//! fn base_dir<E: ReadEnv>(env: &E) -> String {
//!     env.var("HIKKA_DIR").unwrap_or_else(|_| "/root/data".to_string())
//! }
//!
//! let dir = base_dir(&SystemEnv);
//! ```

mod in_memory;
mod read_env;
mod system;

#[cfg(any(test, feature = "test-support"))]
pub use in_memory::InMemoryEnv;
pub use read_env::ReadEnv;
pub use system::SystemEnv;
