//! Command line configuration layer.

use crate::layer::ConfigLayer;
use crate::options::keys;
use crate::value::ConfigValue;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use std::collections::HashMap;

/// Name the command line layer is registered under by default.
pub const COMMAND_LINE_ARGS: &str = "commandLineArgs";

/// Returns the standard `--dotenv-*` flags, each bound to its option key.
///
/// # Example
/// ```
/// use dotspice::cli::{dotenv_args, ArgsLayer};
/// use dotspice::{ConfigLayer, ConfigValue};
/// use clap::Command;
///
/// let matches = Command::new("app")
///     .args(dotenv_args())
///     .try_get_matches_from(["app", "--dotenv-path", "/srv/.env", "--dotenv-priority", "high"])
///     .unwrap();
///
/// let layer = ArgsLayer::new(matches);
/// assert_eq!(layer.get("dotenv.path"), Some(ConfigValue::from("/srv/.env")));
/// assert_eq!(layer.get("dotenv.priority"), Some(ConfigValue::from("high")));
/// assert_eq!(layer.get("dotenv.fail-on-missing"), None);
/// ```
pub fn dotenv_args() -> [Arg; 5] {
    [
        Arg::new(keys::PATH)
            .long("dotenv-path")
            .value_name("PATH")
            .action(ArgAction::Set)
            .help("Location of the .env file"),
        Arg::new(keys::PRIORITY)
            .long("dotenv-priority")
            .value_name("PRIORITY")
            .value_parser(["high", "low"])
            .action(ArgAction::Set)
            .help("Whether .env values override (high) or yield to (low) other settings"),
        Arg::new(keys::FAIL_ON_MISSING)
            .long("dotenv-fail-on-missing")
            .action(ArgAction::SetTrue)
            .help("Abort startup when the .env file is missing"),
        Arg::new(keys::RELOAD_ENABLED)
            .long("dotenv-reload")
            .action(ArgAction::SetTrue)
            .help("Allow the .env file to be reloaded at runtime"),
        Arg::new(keys::ENABLED)
            .long("no-dotenv")
            .action(ArgAction::SetFalse)
            .help("Do not load the .env file"),
    ]
}

/// Configuration layer over parsed command line arguments.
///
/// Only arguments given on the command line are visible; clap defaults are
/// ignored so they cannot shadow lower layers. Argument ids containing a `.`
/// are used as keys verbatim, other ids are normalized (`db_host` and
/// `db-host` both become `db.host`) unless a mapping says otherwise.
pub struct ArgsLayer {
    name: String,
    /// Parsed command line arguments
    matches: ArgMatches,
    /// Explicitly provided values by configuration key
    values: HashMap<String, ConfigValue>,
    /// Argument id to key mappings for custom key names
    mappings: HashMap<String, String>,
}

impl ArgsLayer {
    /// Creates a layer from parsed command line arguments.
    pub fn new(matches: ArgMatches) -> Self {
        Self::with_mappings(matches, HashMap::new())
    }

    /// Creates a layer with custom argument-id-to-key mappings.
    ///
    /// # Example
    /// ```
    /// use dotspice::cli::ArgsLayer;
    /// use dotspice::{ConfigLayer, ConfigValue};
    /// use clap::{Arg, Command};
    /// use std::collections::HashMap;
    ///
    /// let matches = Command::new("app")
    ///     .arg(Arg::new("env_file").long("env-file"))
    ///     .try_get_matches_from(["app", "--env-file", "custom.env"])
    ///     .unwrap();
    ///
    /// let mappings = HashMap::from([("env_file".to_string(), "dotenv.path".to_string())]);
    /// let layer = ArgsLayer::with_mappings(matches, mappings);
    /// assert_eq!(layer.get("dotenv.path"), Some(ConfigValue::from("custom.env")));
    /// ```
    pub fn with_mappings(matches: ArgMatches, mappings: HashMap<String, String>) -> Self {
        let mut layer = Self {
            name: COMMAND_LINE_ARGS.to_string(),
            matches,
            values: HashMap::new(),
            mappings,
        };
        layer.collect_values();
        layer
    }

    /// Adds a mapping from an argument id to a configuration key.
    pub fn add_mapping(&mut self, arg_id: impl Into<String>, config_key: impl Into<String>) {
        self.mappings.insert(arg_id.into(), config_key.into());
        self.collect_values();
    }

    /// Registers the layer under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }

    fn collect_values(&mut self) {
        let mut values = HashMap::new();

        for id in self.matches.ids() {
            let id = id.as_str();
            if self.matches.value_source(id) != Some(ValueSource::CommandLine) {
                continue;
            }

            let key = self
                .mappings
                .get(id)
                .cloned()
                .unwrap_or_else(|| normalize_arg_id(id));
            self.insert_arg_values(id, &key, &mut values);
        }

        self.values = values;
    }

    /// Converts one argument to values. Repeated arguments become
    /// `key[0]`, `key[1]`, ...
    fn insert_arg_values(&self, id: &str, key: &str, out: &mut HashMap<String, ConfigValue>) {
        if let Ok(Some(&flag)) = self.matches.try_get_one::<bool>(id) {
            out.insert(key.to_string(), ConfigValue::Boolean(flag));
            return;
        }

        if let Ok(Some(&count)) = self.matches.try_get_one::<u8>(id) {
            out.insert(key.to_string(), ConfigValue::Integer(i64::from(count)));
            return;
        }

        if let Ok(Some(values)) = self.matches.try_get_many::<String>(id) {
            let values: Vec<&String> = values.collect();
            match values.as_slice() {
                [single] => {
                    out.insert(key.to_string(), ConfigValue::String((*single).clone()));
                }
                many => {
                    for (i, value) in many.iter().enumerate() {
                        out.insert(format!("{key}[{i}]"), ConfigValue::String((*value).clone()));
                    }
                }
            }
        }
    }
}

fn normalize_arg_id(id: &str) -> String {
    if id.contains('.') {
        id.to_string()
    } else {
        id.replace(['-', '_'], ".").to_lowercase()
    }
}

impl ConfigLayer for ArgsLayer {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
