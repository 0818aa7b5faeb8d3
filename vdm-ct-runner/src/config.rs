// Copyright (c) The vdm-view Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for vdm-view.
//!
//! Settings are read from `.config/vdm-view.toml` in the workspace root, or an explicitly
//! specified file, and layered over defaults embedded in the binary.

use crate::errors::ConfigError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{collections::BTreeSet, io};
use tracing::{debug, warn};

/// The config file location relative to the workspace root.
pub const CONFIG_PATH: &str = ".config/vdm-view.toml";

/// Specifies where to load configuration from.
#[derive(Clone, Copy, Debug)]
pub enum ConfigLocation<'a> {
    /// Look for [`CONFIG_PATH`] under the given workspace root. A missing file is not an error.
    Workspace(&'a Utf8Path),

    /// Load configuration from an explicit path. A missing file is an error.
    Explicit(&'a Utf8Path),

    /// Use the embedded defaults only.
    Isolated,
}

/// Combinatorial testing settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CtConfig {
    /// The number of tests displayed per test group.
    pub group_size: u32,

    /// Multiplies the group size to get the number of results between view refreshes.
    pub batch_size_modifier: u32,

    /// Where test results are cached, relative to the workspace root.
    pub storage_dir: Utf8PathBuf,
}

/// Diagram settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RtlogConfig {
    /// The font size in pixels.
    pub font_size: f64,

    /// The font family.
    pub font_family: String,

    /// The width of the visible area in pixels.
    pub screen_width: f64,

    /// The height of the visible area in pixels.
    pub screen_height: f64,
}

/// Resolved configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct VdmViewConfig {
    /// Combinatorial testing settings.
    pub ct: CtConfig,

    /// Diagram settings.
    pub rtlog: RtlogConfig,
}

impl VdmViewConfig {
    const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Loads configuration from the given location.
    pub fn from_location(location: ConfigLocation<'_>) -> Result<Self, ConfigError> {
        Self::from_location_with_warnings(location, &mut DefaultConfigWarnings)
    }

    fn from_location_with_warnings(
        location: ConfigLocation<'_>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigError> {
        let default_config = Self::from_embedded()?;
        let (path, overrides) = match location {
            ConfigLocation::Isolated => {
                debug!("config: using embedded defaults only");
                return Ok(default_config);
            }
            ConfigLocation::Workspace(root) => {
                let path = root.join(CONFIG_PATH);
                let config = DeserializedConfig::from_path_with_warnings(&path, warnings)?;
                (path, config)
            }
            ConfigLocation::Explicit(path) => {
                match DeserializedConfig::from_path_with_warnings(path, warnings)? {
                    Some(config) => (path.to_owned(), Some(config)),
                    None => {
                        return Err(ConfigError::FileNotFound {
                            path: path.to_owned(),
                        });
                    }
                }
            }
        };

        match overrides {
            Some(overrides) => default_config.apply(overrides, &path),
            None => Ok(default_config),
        }
    }

    fn from_embedded() -> Result<Self, ConfigError> {
        let deserializer =
            toml::Deserializer::parse(Self::DEFAULT_CONFIG).map_err(ConfigError::DefaultParse)?;
        let mut unknown = BTreeSet::new();
        let config: DefaultConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })
        .map_err(ConfigError::DefaultParse)?;
        if !unknown.is_empty() {
            warn!("embedded default config has unknown keys: {unknown:?}");
        }

        Ok(Self {
            ct: CtConfig {
                group_size: config.ct.group_size,
                batch_size_modifier: config.ct.batch_size_modifier,
                storage_dir: config.ct.storage_dir,
            },
            rtlog: RtlogConfig {
                font_size: f64::from(config.rtlog.font_size),
                font_family: config.rtlog.font_family,
                screen_width: f64::from(config.rtlog.screen_width),
                screen_height: f64::from(config.rtlog.screen_height),
            },
        })
    }

    fn apply(
        mut self,
        overrides: DeserializedConfig,
        path: &Utf8Path,
    ) -> Result<Self, ConfigError> {
        if let Some(ct) = overrides.ct {
            if let Some(group_size) = ct.group_size {
                self.ct.group_size = check_min(path, "ct.group-size", group_size, 1)?;
            }
            if let Some(modifier) = ct.batch_size_modifier {
                self.ct.batch_size_modifier =
                    check_min(path, "ct.batch-size-modifier", modifier, 1)?;
            }
            if let Some(storage_dir) = ct.storage_dir {
                self.ct.storage_dir = storage_dir;
            }
        }
        if let Some(rtlog) = overrides.rtlog {
            if let Some(font_size) = rtlog.font_size {
                self.rtlog.font_size =
                    f64::from(check_min(path, "rtlog.font-size", font_size, 1)?);
            }
            if let Some(font_family) = rtlog.font_family {
                self.rtlog.font_family = font_family;
            }
            if let Some(width) = rtlog.screen_width {
                self.rtlog.screen_width =
                    f64::from(check_min(path, "rtlog.screen-width", width, 1)?);
            }
            if let Some(height) = rtlog.screen_height {
                self.rtlog.screen_height =
                    f64::from(check_min(path, "rtlog.screen-height", height, 1)?);
            }
        }
        Ok(self)
    }
}

fn check_min(
    path: &Utf8Path,
    key: &'static str,
    value: u32,
    min: u32,
) -> Result<u32, ConfigError> {
    if value < min {
        Err(ConfigError::InvalidValue {
            path: path.to_owned(),
            key,
            min: u64::from(min),
            value: u64::from(value),
        })
    } else {
        Ok(value)
    }
}

/// Handles warnings produced while loading configuration.
trait ConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// The embedded defaults, where every setting is required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultConfig {
    ct: DefaultCtConfig,
    rtlog: DefaultRtlogConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultCtConfig {
    group_size: u32,
    batch_size_modifier: u32,
    storage_dir: Utf8PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultRtlogConfig {
    font_size: u32,
    font_family: String,
    screen_width: u32,
    screen_height: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    #[serde(default)]
    ct: Option<DeserializedCtConfig>,
    #[serde(default)]
    rtlog: Option<DeserializedRtlogConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedCtConfig {
    #[serde(default)]
    group_size: Option<u32>,
    #[serde(default)]
    batch_size_modifier: Option<u32>,
    #[serde(default)]
    storage_dir: Option<Utf8PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedRtlogConfig {
    #[serde(default)]
    font_size: Option<u32>,
    #[serde(default)]
    font_family: Option<String>,
    #[serde(default)]
    screen_width: Option<u32>,
    #[serde(default)]
    screen_height: Option<u32>,
}

impl DeserializedConfig {
    /// Returns `Ok(None)` if the file does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        debug!("config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: DeserializedConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}
