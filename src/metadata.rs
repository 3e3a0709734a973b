//! Delimited (CSV/TSV) sample metadata.
//!
//! The first non-comment row holds the headers. Headers are translated to
//! canonical fields through a [`HeaderMap`]; a file lacking any required
//! field is rejected as a whole with `MISSING_FIELD`. Otherwise every row
//! with a usable sample ID becomes one [`MetadataRecord`] and row-level
//! problems are recorded as warnings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify;
use crate::domain::{CanonicalLocation, HeaderKey, MetadataField, MetadataRecord};
use crate::error::IngestError;
use crate::report::{ErrorIndex, WarningIndex};

/// Raw location strings this short are never resolved.
pub const MIN_LOCATION_LEN: usize = 3;

/// Header texts of the downloadable metadata template.
pub const TEMPLATE_HEADERS: [(&str, MetadataField); 6] = [
    ("Sample Private ID", MetadataField::PrivateId),
    ("Sample Public ID", MetadataField::PublicId),
    ("Collection Date", MetadataField::CollectionDate),
    ("Collection Location", MetadataField::CollectionLocation),
    ("Sequencing Date", MetadataField::SequencingDate),
    ("Sample is Private", MetadataField::KeepPrivate),
];

/// Case-insensitive translation of header text to canonical fields.
/// Canonical key names (`privateId`, ...) are always recognized.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: HashMap<String, MetadataField>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template() -> Self {
        let mut map = Self::new();
        for (header, field) in TEMPLATE_HEADERS {
            map.insert(header, field);
        }
        map
    }

    pub fn insert(&mut self, header: &str, field: MetadataField) {
        self.entries.insert(normalize_header(header), field);
    }

    pub fn translate(&self, header: &str) -> HeaderKey {
        if let Some(field) = self.entries.get(&normalize_header(header)) {
            return HeaderKey::Known(*field);
        }
        match header.parse::<MetadataField>() {
            Ok(field) => HeaderKey::Known(field),
            Err(_) => HeaderKey::Unknown(header.trim().to_string()),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// How a metadata file is read: header translation, columns that must be
/// present, and sample IDs to skip (the template's example rows).
#[derive(Debug, Clone)]
pub struct MetadataRules {
    pub header_map: HeaderMap,
    pub required: Vec<MetadataField>,
    pub ignored_sample_ids: BTreeSet<String>,
}

impl Default for MetadataRules {
    fn default() -> Self {
        Self {
            header_map: HeaderMap::template(),
            required: MetadataField::REQUIRED.to_vec(),
            ignored_sample_ids: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataParseResult {
    pub filename: String,
    pub data: BTreeMap<String, MetadataRecord>,
    pub error_index: ErrorIndex,
    pub warning_index: WarningIndex,
    #[serde(skip)]
    pub unknown_headers: BTreeSet<String>,
}

impl MetadataParseResult {
    fn empty(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            data: BTreeMap::new(),
            error_index: ErrorIndex::new(),
            warning_index: WarningIndex::new(),
            unknown_headers: BTreeSet::new(),
        }
    }
}

pub fn parse_tabular<F>(
    filename: &str,
    bytes: &[u8],
    header_map: &HeaderMap,
    required: &[MetadataField],
    mut resolve_location: F,
    ignored_sample_ids: &BTreeSet<String>,
) -> Result<MetadataParseResult, IngestError>
where
    F: FnMut(&str) -> Option<Arc<CanonicalLocation>>,
{
    let read_err = |err: csv::Error| IngestError::Metadata {
        filename: filename.to_string(),
        message: err.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::Headers)
        .delimiter(detect_delimiter(filename, bytes))
        .from_reader(bytes);

    let headers = reader.headers().map_err(read_err)?.clone();
    let mut result = MetadataParseResult::empty(filename);
    let mut columns: HashMap<MetadataField, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        match header_map.translate(header) {
            HeaderKey::Known(field) => {
                columns.entry(field).or_insert(index);
            }
            HeaderKey::Unknown(name) if !name.is_empty() => {
                result.unknown_headers.insert(name);
            }
            HeaderKey::Unknown(_) => {}
        }
    }

    let missing: BTreeSet<MetadataField> = required
        .iter()
        .copied()
        .filter(|field| !columns.contains_key(field))
        .collect();
    if !missing.is_empty() {
        warn!(filename, ?missing, "metadata file lacks required columns");
        result.error_index.record_missing_fields(missing);
        return Ok(result);
    }

    let row = Row { columns: &columns };
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        let Some(sample_id) = row
            .text(&record, MetadataField::PrivateId)
            .map(|id| id.trim().to_string())
        else {
            continue;
        };
        if ignored_sample_ids.contains(&sample_id) {
            continue;
        }

        let raw_location = row.text(&record, MetadataField::CollectionLocation);
        let mut metadata = MetadataRecord::new(sample_id.clone());
        metadata.public_id = row.text(&record, MetadataField::PublicId);
        metadata.collection_date = row.text(&record, MetadataField::CollectionDate);
        metadata.sequencing_date = row.text(&record, MetadataField::SequencingDate);
        metadata.keep_private = row
            .text(&record, MetadataField::KeepPrivate)
            .and_then(|value| parse_yes_no(&value));
        metadata.collection_location = raw_location
            .as_deref()
            .filter(|raw| raw.chars().count() >= MIN_LOCATION_LEN)
            .and_then(&mut resolve_location);

        if result.data.contains_key(&sample_id) {
            debug!(filename, sample_id = %sample_id, "duplicate metadata row replaces earlier row");
            result.warning_index.remove_sample(&sample_id);
        }
        if let Some(fields) = classify::missing_required(&metadata) {
            result.warning_index.add_missing_data(&sample_id, fields);
        }
        if let Some(fields) = classify::bad_format(&metadata) {
            result.warning_index.add_bad_format_data(&sample_id, fields);
        }
        if raw_location.is_some() && metadata.collection_location.is_none() {
            result.warning_index.add_bad_location_format(&sample_id);
        }
        result.data.insert(sample_id, metadata);
    }

    debug!(filename, rows = result.data.len(), "parsed metadata file");
    Ok(result)
}

struct Row<'a> {
    columns: &'a HashMap<MetadataField, usize>,
}

impl Row<'_> {
    /// Cell text as written. Absent and whitespace-only cells are `None`.
    fn text(&self, record: &StringRecord, field: MetadataField) -> Option<String> {
        self.columns
            .get(&field)
            .and_then(|index| record.get(*index))
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
    }
}

pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Tab for `.tsv`, comma for `.csv`; otherwise tab only if the first
/// non-comment line contains one.
pub fn detect_delimiter(filename: &str, bytes: &[u8]) -> u8 {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".tsv") {
        return b'\t';
    }
    if lower.ends_with(".csv") {
        return b',';
    }
    let text = String::from_utf8_lossy(bytes);
    let first = text
        .lines()
        .find(|line| !line.trim().is_empty() && !line.starts_with('#'));
    match first {
        Some(line) if line.contains('\t') => b'\t',
        _ => b',',
    }
}
