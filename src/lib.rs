//! World Simulation Realtime Client - Main Library
//!
//! Ties the realtime connection layer and the world domain together for the
//! binaries in this package.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **simworld**: World events, endpoints, semantic events and bindings (re-exported from workspace)
//! - **livewire**: Realtime connection layer (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use worldsim_realtime::bin_common::{load_config_from_env, ConfigType};
//! use worldsim_realtime::simworld::RealtimeConfig;
//! ```

// Re-export workspace libraries for convenience
pub use livewire;
pub use simworld;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
