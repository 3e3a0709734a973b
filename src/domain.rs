use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

pub const MAX_SAMPLE_ID_LEN: usize = 120;

static SAMPLE_ID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z._/ -]+$").expect("valid sample id regex"));

/// Sample identifiers are limited to letters, digits, `.`, `-`, `_`, `/` and
/// spaces, at most 120 characters.
pub fn is_valid_sample_id(value: &str) -> bool {
    value.chars().count() <= MAX_SAMPLE_ID_LEN && SAMPLE_ID_CHARS.is_match(value)
}

/// One uploaded file (or archive entry) held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl SequenceFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSequenceRecord {
    pub sample_id: String,
    pub filename: String,
    pub sequence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataField {
    PrivateId,
    PublicId,
    CollectionDate,
    CollectionLocation,
    SequencingDate,
    KeepPrivate,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::PrivateId,
        MetadataField::PublicId,
        MetadataField::CollectionDate,
        MetadataField::CollectionLocation,
        MetadataField::SequencingDate,
        MetadataField::KeepPrivate,
    ];

    pub const REQUIRED: [MetadataField; 3] = [
        MetadataField::PrivateId,
        MetadataField::CollectionDate,
        MetadataField::CollectionLocation,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetadataField::PrivateId => "privateId",
            MetadataField::PublicId => "publicId",
            MetadataField::CollectionDate => "collectionDate",
            MetadataField::CollectionLocation => "collectionLocation",
            MetadataField::SequencingDate => "sequencingDate",
            MetadataField::KeepPrivate => "keepPrivate",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for MetadataField {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        MetadataField::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| IngestError::UnknownField(value.to_string()))
    }
}

/// A metadata column header after translation through the header map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    Known(MetadataField),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub private_id: String,
    pub collection_date: Option<String>,
    pub collection_location: Option<Arc<CanonicalLocation>>,
    pub public_id: Option<String>,
    pub sequencing_date: Option<String>,
    pub keep_private: Option<bool>,
}

impl MetadataRecord {
    pub fn new(private_id: impl Into<String>) -> Self {
        Self {
            private_id: private_id.into(),
            collection_date: None,
            collection_location: None,
            public_id: None,
            sequencing_date: None,
            keep_private: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationTier {
    Region,
    Country,
    Division,
    Location,
}

impl LocationTier {
    pub const ALL: [LocationTier; 4] = [
        LocationTier::Region,
        LocationTier::Country,
        LocationTier::Division,
        LocationTier::Location,
    ];
}

impl fmt::Display for LocationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationTier::Region => write!(f, "region"),
            LocationTier::Country => write!(f, "country"),
            LocationTier::Division => write!(f, "division"),
            LocationTier::Location => write!(f, "location"),
        }
    }
}

/// A reference gazetteer entry. `name` is derived from the hierarchy and is
/// never read from input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocationEntry")]
pub struct CanonicalLocation {
    pub id: u64,
    pub region: Option<String>,
    pub country: Option<String>,
    pub division: Option<String>,
    pub location: Option<String>,
    pub name: String,
}

#[derive(Deserialize)]
struct LocationEntry {
    id: u64,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    division: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl From<LocationEntry> for CanonicalLocation {
    fn from(entry: LocationEntry) -> Self {
        CanonicalLocation::new(
            entry.id,
            entry.region,
            entry.country,
            entry.division,
            entry.location,
        )
    }
}

impl CanonicalLocation {
    pub fn new(
        id: u64,
        region: Option<String>,
        country: Option<String>,
        division: Option<String>,
        location: Option<String>,
    ) -> Self {
        let mut loc = Self {
            id,
            region: non_blank(region),
            country: non_blank(country),
            division: non_blank(division),
            location: non_blank(location),
            name: String::new(),
        };
        loc.name = loc.derive_name();
        loc
    }

    pub fn level(&self, tier: LocationTier) -> Option<&str> {
        match tier {
            LocationTier::Region => self.region.as_deref(),
            LocationTier::Country => self.country.as_deref(),
            LocationTier::Division => self.division.as_deref(),
            LocationTier::Location => self.location.as_deref(),
        }
    }

    fn derive_name(&self) -> String {
        LocationTier::ALL
            .into_iter()
            .map_while(|tier| self.level(tier))
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
