// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Layered configuration for V-turn applications.
//!
//! A configuration struct is built from (lowest to highest precedence):
//!
//!  1. the struct's `Default` implementation,
//!  2. a TOML file named by the `conf_file` field,
//!  3. environment variables prefixed with [`ENV_PREFIX`],
//!  4. the command-line arguments.
//!
//! Every field of a configuration struct is an `Option` so that values that
//! are not given on the command line do not override the lower layers. The
//! `Default` implementation should return `Some(..)` for each field that has
//! a default.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use vturn_config::{MultiSourceConfig, load_config, merge_fields};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Config {
//!     radix: Option<usize>,
//!     name: Option<String>,
//!     #[serde(skip)]
//!     conf_file: Option<std::path::PathBuf>,
//! }
//!
//! impl Default for Config {
//!     fn default() -> Self {
//!         Self {
//!             radix: Some(8),
//!             name: Some("fat-tree".to_string()),
//!             conf_file: None,
//!         }
//!     }
//! }
//!
//! impl MultiSourceConfig for Config {
//!     fn conf_file(&self) -> Option<&std::path::Path> {
//!         self.conf_file.as_deref()
//!     }
//!
//!     fn merge_from(&mut self, other: Self) {
//!         merge_fields!(self, other ; radix, name, conf_file);
//!     }
//! }
//!
//! let cli = Config { radix: Some(4), name: None, conf_file: None };
//! let config = load_config(cli).unwrap();
//! assert_eq!(config.radix, Some(4));
//! assert_eq!(config.name.as_deref(), Some("fat-tree"));
//! ```

use std::fmt;
use std::io;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Prefix of the environment variables that are merged into a configuration.
pub const ENV_PREFIX: &str = "VTURN_";

/// Errors returned while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be used.
    Io(io::Error),

    /// The merged configuration could not be extracted.
    Extract(Box<figment::Error>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config file error: {e}"),
            ConfigError::Extract(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Extract(Box::new(e))
    }
}

/// Implemented by configuration structs that can be built from all sources.
pub trait MultiSourceConfig: Default + Serialize + DeserializeOwned {
    /// The TOML file that should be merged, if any.
    fn conf_file(&self) -> Option<&Path>;

    /// Overwrite each field of `self` with the field in `other` if it is set.
    fn merge_from(&mut self, other: Self);
}

/// Overwrite the named `Option` fields of `$config` with those that are set
/// in `$other`.
#[macro_export]
macro_rules! merge_fields {
    ($config:expr, $other:expr ; $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $config.$field = $other.$field;
            }
        )+
    };
}

/// Check that an extra configuration file can be used.
///
/// An empty path is accepted and means there is no file to read.
pub fn parse_extra_conf_file(conf_file: &Path) -> Result<(), io::Error> {
    if conf_file.as_os_str().is_empty() {
        return Ok(());
    }

    if conf_file.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::IsADirectory,
            format!("{} is not a file path", conf_file.display()),
        ));
    }

    if !conf_file.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", conf_file.display()),
        ));
    }

    Ok(())
}

/// Build the [`Figment`] holding the defaults, the config file and the
/// environment.
pub fn figment_for<T: MultiSourceConfig>(conf_file: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(T::default()));
    if let Some(conf_file) = conf_file {
        if !conf_file.as_os_str().is_empty() {
            figment = figment.merge(Toml::file(conf_file));
        }
    }
    figment.merge(Env::prefixed(ENV_PREFIX))
}

/// Merge all configuration sources with the command-line values in `cli`
/// taking the highest precedence.
pub fn load_config<T: MultiSourceConfig>(cli: T) -> Result<T, ConfigError> {
    if let Some(conf_file) = cli.conf_file() {
        parse_extra_conf_file(conf_file)?;
    }

    let mut config: T = figment_for::<T>(cli.conf_file()).extract()?;
    config.merge_from(cli);
    Ok(config)
}
