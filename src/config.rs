use std::{collections::HashMap, path::PathBuf};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::{model::library::Linkage, selector::VariantBinarySelector};

/// Settings read from `SUBRESOLVE_*` environment variables.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubresolveConfig {
    pub descriptor_file: Option<PathBuf>,
    pub target: VariantBinarySelector,
}

impl SubresolveConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(RawConfig::load(None)?.into())
    }
}

impl From<RawConfig> for SubresolveConfig {
    fn from(raw_config: RawConfig) -> Self {
        Self {
            descriptor_file: raw_config.descriptor.file,
            target: VariantBinarySelector {
                platform: raw_config.target.platform,
                flavor: raw_config.target.flavor,
                build_type: raw_config.target.buildtype,
                linkage: raw_config.target.linkage,
            },
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    descriptor: DescriptorConfig,
    #[serde(default)]
    target: TargetConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct DescriptorConfig {
    file: Option<PathBuf>,
}

// Keys are single words since `_` separates nesting levels.
#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct TargetConfig {
    platform: Option<String>,
    flavor: Option<String>,
    buildtype: Option<String>,
    linkage: Option<Linkage>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("SUBRESOLVE")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
