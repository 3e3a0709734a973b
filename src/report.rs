//! Error and warning indexes produced by ingestion.
//!
//! Each kind carries its own payload type. The indexes never hold a kind
//! with an empty payload: inserting nothing is a no-op and removals prune
//! emptied entries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::MetadataField;

/// Sample ID to the set of offending fields of that sample.
pub type SampleFields = BTreeMap<String, BTreeSet<MetadataField>>;

/// Key-wise combination of two partial results. `other` is the later input:
/// plain maps take its value on collision, sets and indexes union.
pub trait Merge: Sized {
    fn merge(&mut self, other: Self);

    fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }
}

impl<K: Ord, V> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

fn merge_sample_fields(target: &mut SampleFields, other: SampleFields) {
    for (sample, fields) in other {
        target.entry(sample).or_default().extend(fields);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnrecognizedFormat,
    InvalidName,
    MissingField,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 3] = [
        ErrorCode::UnrecognizedFormat,
        ErrorCode::InvalidName,
        ErrorCode::MissingField,
    ];

    /// Fatal errors abort ingestion of the whole file.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::MissingField)
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnrecognizedFormat => "UNRECOGNIZED_FORMAT",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::MissingField => "MISSING_FIELD",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrowed view of one populated error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError<'a> {
    UnrecognizedFormat(&'a BTreeSet<String>),
    InvalidName(&'a BTreeSet<String>),
    MissingField(&'a BTreeSet<MetadataField>),
}

impl ParseError<'_> {
    pub fn code(&self) -> ErrorCode {
        match self {
            ParseError::UnrecognizedFormat(_) => ErrorCode::UnrecognizedFormat,
            ParseError::InvalidName(_) => ErrorCode::InvalidName,
            ParseError::MissingField(_) => ErrorCode::MissingField,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorIndex {
    unrecognized_format: BTreeSet<String>,
    invalid_name: BTreeSet<String>,
    missing_field: BTreeSet<MetadataField>,
}

impl ErrorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_unrecognized_format(&mut self, filename: impl Into<String>) {
        self.unrecognized_format.insert(filename.into());
    }

    pub fn record_invalid_name(&mut self, filename: impl Into<String>) {
        self.invalid_name.insert(filename.into());
    }

    pub fn record_missing_fields(&mut self, fields: impl IntoIterator<Item = MetadataField>) {
        self.missing_field.extend(fields);
    }

    pub fn get(&self, code: ErrorCode) -> Option<ParseError<'_>> {
        let error = match code {
            ErrorCode::UnrecognizedFormat => ParseError::UnrecognizedFormat(&self.unrecognized_format),
            ErrorCode::InvalidName => ParseError::InvalidName(&self.invalid_name),
            ErrorCode::MissingField => ParseError::MissingField(&self.missing_field),
        };
        let populated = match error {
            ParseError::UnrecognizedFormat(set) | ParseError::InvalidName(set) => !set.is_empty(),
            ParseError::MissingField(set) => !set.is_empty(),
        };
        populated.then_some(error)
    }

    pub fn contains(&self, code: ErrorCode) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParseError<'_>> {
        ErrorCode::ALL.into_iter().filter_map(|code| self.get(code))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn has_fatal(&self) -> bool {
        self.iter().any(|error| error.code().is_fatal())
    }
}

impl Merge for ErrorIndex {
    fn merge(&mut self, other: Self) {
        self.unrecognized_format.extend(other.unrecognized_format);
        self.invalid_name.extend(other.invalid_name);
        self.missing_field.extend(other.missing_field);
    }
}

impl Serialize for ErrorIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for error in self.iter() {
            match error {
                ParseError::UnrecognizedFormat(set) | ParseError::InvalidName(set) => {
                    map.serialize_entry(&error.code(), set)?
                }
                ParseError::MissingField(set) => map.serialize_entry(&error.code(), set)?,
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    MissingData,
    BadFormatData,
    ExtraneousEntry,
    AbsentSample,
    AutoCorrect,
    UnknownDataFields,
    BadLocationFormat,
}

impl WarningCode {
    pub const ALL: [WarningCode; 7] = [
        WarningCode::MissingData,
        WarningCode::BadFormatData,
        WarningCode::ExtraneousEntry,
        WarningCode::AbsentSample,
        WarningCode::AutoCorrect,
        WarningCode::UnknownDataFields,
        WarningCode::BadLocationFormat,
    ];

    fn as_str(self) -> &'static str {
        match self {
            WarningCode::MissingData => "MISSING_DATA",
            WarningCode::BadFormatData => "BAD_FORMAT_DATA",
            WarningCode::ExtraneousEntry => "EXTRANEOUS_ENTRY",
            WarningCode::AbsentSample => "ABSENT_SAMPLE",
            WarningCode::AutoCorrect => "AUTO_CORRECT",
            WarningCode::UnknownDataFields => "UNKNOWN_DATA_FIELDS",
            WarningCode::BadLocationFormat => "BAD_LOCATION_FORMAT",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrowed view of one populated warning kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning<'a> {
    MissingData(&'a SampleFields),
    BadFormatData(&'a SampleFields),
    ExtraneousEntry(&'a BTreeSet<String>),
    AbsentSample(&'a BTreeSet<String>),
    AutoCorrect(&'a SampleFields),
    UnknownDataFields(&'a BTreeSet<String>),
    BadLocationFormat(&'a SampleFields),
}

impl Warning<'_> {
    pub fn code(&self) -> WarningCode {
        match self {
            Warning::MissingData(_) => WarningCode::MissingData,
            Warning::BadFormatData(_) => WarningCode::BadFormatData,
            Warning::ExtraneousEntry(_) => WarningCode::ExtraneousEntry,
            Warning::AbsentSample(_) => WarningCode::AbsentSample,
            Warning::AutoCorrect(_) => WarningCode::AutoCorrect,
            Warning::UnknownDataFields(_) => WarningCode::UnknownDataFields,
            Warning::BadLocationFormat(_) => WarningCode::BadLocationFormat,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Warning::MissingData(map)
            | Warning::BadFormatData(map)
            | Warning::AutoCorrect(map)
            | Warning::BadLocationFormat(map) => map.is_empty(),
            Warning::ExtraneousEntry(set)
            | Warning::AbsentSample(set)
            | Warning::UnknownDataFields(set) => set.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningIndex {
    missing_data: SampleFields,
    bad_format_data: SampleFields,
    extraneous_entry: BTreeSet<String>,
    absent_sample: BTreeSet<String>,
    auto_correct: SampleFields,
    unknown_data_fields: BTreeSet<String>,
    bad_location_format: SampleFields,
}

impl WarningIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_missing_data(&mut self, sample_id: &str, fields: BTreeSet<MetadataField>) {
        add_sample_fields(&mut self.missing_data, sample_id, fields);
    }

    pub fn add_bad_format_data(&mut self, sample_id: &str, fields: BTreeSet<MetadataField>) {
        add_sample_fields(&mut self.bad_format_data, sample_id, fields);
    }

    pub fn add_bad_location_format(&mut self, sample_id: &str) {
        add_sample_fields(
            &mut self.bad_location_format,
            sample_id,
            BTreeSet::from([MetadataField::CollectionLocation]),
        );
    }

    pub fn add_extraneous_entries(&mut self, sample_ids: impl IntoIterator<Item = String>) {
        self.extraneous_entry.extend(sample_ids);
    }

    pub fn add_absent_samples(&mut self, sample_ids: impl IntoIterator<Item = String>) {
        self.absent_sample.extend(sample_ids);
    }

    pub fn add_unknown_data_fields(&mut self, headers: impl IntoIterator<Item = String>) {
        self.unknown_data_fields.extend(headers);
    }

    /// Drops every per-sample warning recorded for `sample_id`.
    pub fn remove_sample(&mut self, sample_id: &str) {
        for map in [
            &mut self.missing_data,
            &mut self.bad_format_data,
            &mut self.auto_correct,
            &mut self.bad_location_format,
        ] {
            map.remove(sample_id);
        }
    }

    pub fn get(&self, code: WarningCode) -> Option<Warning<'_>> {
        let warning = match code {
            WarningCode::MissingData => Warning::MissingData(&self.missing_data),
            WarningCode::BadFormatData => Warning::BadFormatData(&self.bad_format_data),
            WarningCode::ExtraneousEntry => Warning::ExtraneousEntry(&self.extraneous_entry),
            WarningCode::AbsentSample => Warning::AbsentSample(&self.absent_sample),
            WarningCode::AutoCorrect => Warning::AutoCorrect(&self.auto_correct),
            WarningCode::UnknownDataFields => Warning::UnknownDataFields(&self.unknown_data_fields),
            WarningCode::BadLocationFormat => Warning::BadLocationFormat(&self.bad_location_format),
        };
        (!warning.is_empty()).then_some(warning)
    }

    pub fn contains(&self, code: WarningCode) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = Warning<'_>> {
        WarningCode::ALL.into_iter().filter_map(|code| self.get(code))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

fn add_sample_fields(map: &mut SampleFields, sample_id: &str, fields: BTreeSet<MetadataField>) {
    if fields.is_empty() {
        return;
    }
    map.entry(sample_id.to_string()).or_default().extend(fields);
}

impl Merge for WarningIndex {
    fn merge(&mut self, other: Self) {
        merge_sample_fields(&mut self.missing_data, other.missing_data);
        merge_sample_fields(&mut self.bad_format_data, other.bad_format_data);
        self.extraneous_entry.extend(other.extraneous_entry);
        self.absent_sample.extend(other.absent_sample);
        merge_sample_fields(&mut self.auto_correct, other.auto_correct);
        self.unknown_data_fields.extend(other.unknown_data_fields);
        merge_sample_fields(&mut self.bad_location_format, other.bad_location_format);
    }
}

impl Serialize for WarningIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for warning in self.iter() {
            let code = warning.code();
            match warning {
                Warning::MissingData(fields)
                | Warning::BadFormatData(fields)
                | Warning::AutoCorrect(fields)
                | Warning::BadLocationFormat(fields) => map.serialize_entry(&code, fields)?,
                Warning::ExtraneousEntry(ids)
                | Warning::AbsentSample(ids)
                | Warning::UnknownDataFields(ids) => map.serialize_entry(&code, ids)?,
            }
        }
        map.end()
    }
}
