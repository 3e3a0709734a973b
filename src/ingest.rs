//! Library boundary consumed by the upload UI.
//!
//! Everything here works on bytes already in memory. Files are processed
//! one after another and folded into a running result with [`Merge`].

use serde::Serialize;
use tracing::debug;

use crate::archive;
use crate::classify;
use crate::domain::{CanonicalLocation, SequenceFile};
use crate::error::IngestError;
use crate::fasta::ScanResult;
use crate::location::{EditDistance, LocationCache, LocationResolver};
use crate::metadata::{self, MetadataParseResult, MetadataRules};
use crate::report::{Merge, WarningIndex};

/// Decodes every file and merges the results. On a sample ID collision the
/// later file wins. A file that cannot be decoded only adds an error entry.
pub fn ingest_sequence_files(files: &[SequenceFile]) -> ScanResult {
    let result = files.iter().fold(ScanResult::default(), |acc, file| {
        acc.merged(archive::decode(&file.filename, &file.bytes))
    });
    debug!(
        files = files.len(),
        samples = result.samples.len(),
        "ingested sequence files"
    );
    result
}

pub fn build_location_resolver(
    candidates: impl IntoIterator<Item = CanonicalLocation>,
) -> LocationResolver {
    LocationResolver::new(candidates)
}

/// Parses one metadata file, resolving locations through `resolver` and
/// memoizing them in `cache`. Headers that map to no known field are
/// reported as `UNKNOWN_DATA_FIELDS`.
pub fn ingest_metadata_file<D: EditDistance>(
    file: &SequenceFile,
    rules: &MetadataRules,
    resolver: &LocationResolver<D>,
    cache: &mut LocationCache,
) -> Result<MetadataParseResult, IngestError> {
    let mut result = metadata::parse_tabular(
        &file.filename,
        &file.bytes,
        &rules.header_map,
        &rules.required,
        |text| resolver.resolve(text, Some(&mut *cache)),
        &rules.ignored_sample_ids,
    )?;
    let unknown = result.unknown_headers.iter().cloned();
    result.warning_index.add_unknown_data_fields(unknown);
    debug!(
        filename = %file.filename,
        rows = result.data.len(),
        "ingested metadata file"
    );
    Ok(result)
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub sequences: ScanResult,
    pub metadata: MetadataParseResult,
    pub reconciliation: WarningIndex,
}

impl UploadReport {
    /// True when the user has to fix and re-upload a file.
    pub fn has_blocking_errors(&self) -> bool {
        !self.sequences.errors.is_empty() || !self.metadata.error_index.is_empty()
    }
}

/// Full upload check: sequences, metadata, and the cross-check of their
/// sample IDs. The cross-check is skipped when the metadata file was
/// rejected outright.
pub fn check_upload<D: EditDistance>(
    sequence_files: &[SequenceFile],
    metadata_file: &SequenceFile,
    rules: &MetadataRules,
    resolver: &LocationResolver<D>,
) -> Result<UploadReport, IngestError> {
    let sequences = ingest_sequence_files(sequence_files);
    let mut cache = resolver.new_cache();
    let metadata = ingest_metadata_file(metadata_file, rules, resolver, &mut cache)?;
    let reconciliation = if metadata.error_index.has_fatal() {
        WarningIndex::new()
    } else {
        classify::reconcile(sequences.samples.keys(), metadata.data.keys())
    };
    Ok(UploadReport {
        sequences,
        metadata,
        reconciliation,
    })
}
