use std::collections::{BTreeMap, BTreeSet};
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalLocation, MetadataField};
use crate::error::IngestError;
use crate::metadata::{HeaderMap, MetadataRules};

pub const DEFAULT_CONFIG_FILE: &str = "pathogen-upload.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    /// Header text to canonical field name, on top of the template headers.
    #[serde(default)]
    pub header_map: BTreeMap<String, String>,
    #[serde(default)]
    pub required_fields: Option<Vec<String>>,
    #[serde(default)]
    pub ignored_sample_ids: Vec<String>,
    #[serde(default)]
    pub locations: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub rules: MetadataRules,
    pub locations: Option<Utf8PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            rules: MetadataRules::default(),
            locations: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `pathogen-upload.json` from the current directory
    /// when no path is given. A missing default file yields the built-in
    /// defaults; a missing explicit file is an error.
    pub fn resolve(path: Option<&Utf8Path>) -> Result<ResolvedConfig, IngestError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| IngestError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IngestError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        // Location files are relative to the config file.
        if let Some(locations) = resolved.locations.as_mut()
            && locations.is_relative()
            && let Some(parent) = config_path.parent()
        {
            *locations = parent.join(&*locations);
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IngestError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mut header_map = HeaderMap::template();
        for (header, field) in &config.header_map {
            header_map.insert(header, field.parse()?);
        }

        let required = match config.required_fields {
            Some(fields) => fields
                .iter()
                .map(|field| field.parse())
                .collect::<Result<Vec<MetadataField>, IngestError>>()?,
            None => MetadataField::REQUIRED.to_vec(),
        };

        let ignored_sample_ids: BTreeSet<String> = config
            .ignored_sample_ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(ResolvedConfig {
            schema_version,
            rules: MetadataRules {
                header_map,
                required,
                ignored_sample_ids,
            },
            locations: config.locations.map(Utf8PathBuf::from),
        })
    }
}

/// Reads the location reference file: a JSON array of
/// `{id, region, country, division, location}` objects.
pub fn load_locations(path: &Utf8Path) -> Result<Vec<CanonicalLocation>, IngestError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|_| IngestError::LocationsRead(path.as_std_path().to_path_buf()))?;
    serde_json::from_str(&content).map_err(|err| IngestError::LocationsParse(err.to_string()))
}
