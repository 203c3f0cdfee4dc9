//! Reads a dotenv file from disk according to the missing-file policy.

use crate::config::LayeredConfig;
use crate::dotenv_parser::{DotenvParser, EnvParser, Variables};
use crate::error::{ConfigError, ConfigResult};
use crate::options::DotenvOptions;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Produces a fresh set of dotenv variables.
///
/// The reload service calls this on every reload. [`DefaultEnvLoader`]
/// reads the options from the layered configuration and then the file;
/// closures of the form `Fn(&LayeredConfig) -> ConfigResult<Variables>`
/// also qualify, which keeps tests free of the filesystem.
pub trait EnvLoader: Send + Sync {
    /// Loads variables using the options currently found in `config`.
    fn load(&self, config: &LayeredConfig) -> ConfigResult<Variables>;
}

impl<F> EnvLoader for F
where
    F: Fn(&LayeredConfig) -> ConfigResult<Variables> + Send + Sync,
{
    fn load(&self, config: &LayeredConfig) -> ConfigResult<Variables> {
        self(config)
    }
}

/// Loader that reads the file named by `dotenv.path` with a pluggable parser.
#[derive(Clone)]
pub struct DefaultEnvLoader {
    parser: Arc<dyn EnvParser>,
}

impl DefaultEnvLoader {
    /// Creates a loader using [`DotenvParser`].
    pub fn new() -> Self {
        Self::with_parser(Arc::new(DotenvParser))
    }

    /// Creates a loader using the given parser.
    pub fn with_parser(parser: Arc<dyn EnvParser>) -> Self {
        Self { parser }
    }
}

impl Default for DefaultEnvLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefaultEnvLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultEnvLoader").finish_non_exhaustive()
    }
}

impl EnvLoader for DefaultEnvLoader {
    fn load(&self, config: &LayeredConfig) -> ConfigResult<Variables> {
        let options = DotenvOptions::from_config(config)?;
        load(&options, self.parser.as_ref())
    }
}

/// Loads variables from the file described by `options`.
///
/// # Errors
/// * `ConfigError::MissingFile` - If the file does not exist and
///   `fail_on_missing` is set
/// * `ConfigError::Read` - If the file exists but cannot be read
pub fn load(options: &DotenvOptions, parser: &dyn EnvParser) -> ConfigResult<Variables> {
    load_from_path(&options.path, options.fail_on_missing, parser)
}

/// Loads variables from `path`.
///
/// A missing file yields an empty map unless `fail_on_missing` is set.
///
/// # Example
/// ```
/// use dotspice::loader::load_from_path;
/// use dotspice::DotenvParser;
///
/// let vars = load_from_path("/definitely/not/here/.env", false, &DotenvParser).unwrap();
/// assert!(vars.is_empty());
///
/// let err = load_from_path("/definitely/not/here/.env", true, &DotenvParser).unwrap_err();
/// assert!(err.is_missing_file());
/// ```
pub fn load_from_path(
    path: impl AsRef<Path>,
    fail_on_missing: bool,
    parser: &dyn EnvParser,
) -> ConfigResult<Variables> {
    let path = path.as_ref();

    if !path.exists() {
        warn!(path = %path.display(), "[Dotenv] .env file not found");
        if fail_on_missing {
            return Err(ConfigError::missing_file(path));
        }
        return Ok(Variables::new());
    }

    let lines = read_lines(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "[Dotenv] Failed to read .env file");
        ConfigError::read(path, e)
    })?;

    let variables = parser.parse(&lines);
    debug!(
        path = %path.display(),
        variables = variables.len(),
        "[Dotenv] Successfully loaded variables"
    );
    Ok(variables)
}

/// Reads the whole file as lines. The handle is closed before returning.
fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}
