//! # dotspice
//!
//! Loads a `.env` file into an application's layered configuration as one
//! more named layer, with a configurable precedence and optional runtime
//! reload.
//!
//! - Parses `KEY=VALUE` lines with comments, blank lines and optional quotes
//! - Fails fast on a missing file, or treats it as empty
//! - Installs the variables ahead of (`high`) or behind (`low`) every other layer
//! - Reloads the file on demand, or on change with a file watcher, swapping
//!   the layer atomically so readers never see a partial state
//!
//! ## Architecture Overview
//!
//! The host owns a [`LayeredConfig`]: an ordered list of named layers where
//! the first layer that knows a key wins. Host layers typically include
//! command line flags, the process environment and a settings file. The
//! dotenv options themselves are ordinary keys in that store:
//!
//! | key | default |
//! |---|---|
//! | `dotenv.enabled` | `true` |
//! | `dotenv.path` | `.env` |
//! | `dotenv.priority` | `low` |
//! | `dotenv.fail-on-missing` | `false` |
//! | `dotenv.reload.enabled` | `false` |
//!
//! ## Quick Start
//!
//! ```rust
//! use dotspice::{load_initial, log_summary, LayeredConfig, MapLayer, ReloadService};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let env = dir.path().join(".env");
//! std::fs::write(&env, "# local overrides\nDATABASE_URL=postgres://localhost/dev\n").unwrap();
//!
//! let config = Arc::new(LayeredConfig::new());
//! config.add_last(Arc::new(
//!     MapLayer::new("application")
//!         .with_value("dotenv.path", env.display().to_string())
//!         .with_value("dotenv.priority", "high")
//!         .with_value("dotenv.reload.enabled", true)
//!         .with_value("DATABASE_URL", "postgres://prod/app"),
//! ));
//!
//! // Startup: load the file and install the layer, then report.
//! load_initial(&config).unwrap();
//! log_summary(&config);
//! assert_eq!(
//!     config.get_string("DATABASE_URL").as_deref(),
//!     Some("postgres://localhost/dev")
//! );
//!
//! // Later: pick up edits without restarting.
//! let service = ReloadService::with_default_loader(Arc::clone(&config)).unwrap();
//! std::fs::write(&env, "DATABASE_URL=postgres://localhost/test\n").unwrap();
//! println!("{}", service.trigger().message());
//! assert_eq!(
//!     config.get_string("DATABASE_URL").as_deref(),
//!     Some("postgres://localhost/test")
//! );
//! ```
//!
//! ## Environment Variables
//!
//! [`EnvConfigLayer`] binds option keys to environment variables, so
//! `DOTENV_PRIORITY=high` or `DOTENV_PATH=/etc/app/.env` work without code
//! changes.
//!
//! ## Command Line Flags
//!
//! With the `cli` feature, `cli::dotenv_args` adds `--dotenv-path`,
//! `--dotenv-priority`, `--dotenv-fail-on-missing`, `--dotenv-reload` and
//! `--no-dotenv` to a clap command, and `cli::ArgsLayer` turns the matches
//! into a layer.
//!
//! ## File Watching
//!
//! ```rust,no_run
//! use dotspice::{DotenvWatcher, LayeredConfig, ReloadService};
//! use std::sync::Arc;
//!
//! let config = Arc::new(LayeredConfig::new());
//! let service = Arc::new(ReloadService::with_default_loader(Arc::clone(&config)).unwrap());
//! service.on_config_change(|event| {
//!     println!("reloaded {} variables", event.variables.len());
//! });
//!
//! let _watcher = DotenvWatcher::for_service(service).unwrap();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return `ConfigResult<T>`, an alias for
//! `Result<T, ConfigError>`:
//!
//! ```rust
//! use dotspice::{load_initial, ConfigError, LayeredConfig, MapLayer};
//! use std::sync::Arc;
//!
//! let config = LayeredConfig::new();
//! config.add_last(Arc::new(
//!     MapLayer::new("application")
//!         .with_value("dotenv.path", "/no/such/dir/.env")
//!         .with_value("dotenv.fail-on-missing", true),
//! ));
//!
//! match load_initial(&config) {
//!     Err(ConfigError::MissingFile { path }) => println!("missing: {}", path.display()),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

pub mod config;
pub mod dotenv_layer;
pub mod dotenv_parser;
pub mod env_layer;
pub mod error;
pub mod file_layer;
pub mod layer;
pub mod loader;
pub mod map_layer;
pub mod options;
pub mod parser;
pub mod priority;
pub mod reload;
pub mod startup;
pub mod value;
pub mod watcher;

// Re-export main types for convenience
pub use config::{LayeredConfig, Placement};
pub use dotenv_layer::DotenvLayer;
pub use dotenv_parser::{DotenvParser, EnvParser, Variables};
pub use env_layer::EnvConfigLayer;
pub use error::{ConfigError, ConfigResult};
pub use file_layer::SettingsFileLayer;
pub use layer::ConfigLayer;
pub use loader::{DefaultEnvLoader, EnvLoader};
pub use map_layer::MapLayer;
pub use options::DotenvOptions;
pub use priority::{install_layer, Priority};
pub use reload::{ReloadEvent, ReloadOutcome, ReloadService, ReloadState};
pub use startup::{load_initial, load_initial_with, log_summary};
pub use value::ConfigValue;
pub use watcher::DotenvWatcher;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::ArgsLayer;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
