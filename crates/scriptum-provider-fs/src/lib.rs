//! Filesystem script provider for scriptum.

mod fs_provider;

pub use fs_provider::{FsProviderConfig, FsScriptProvider};
