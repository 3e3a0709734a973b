//! Linear scanner for FASTA-like text.
//!
//! Identifier lines start with `>` (after optional leading whitespace). The
//! sequence of an identifier is every non-empty line up to the next
//! identifier line, concatenated without the line breaks. Content before the
//! first identifier line is discarded.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{SampleSequenceRecord, is_valid_sample_id};
use crate::report::{ErrorIndex, Merge};

/// Samples keyed by sample ID.
pub type SampleMap = BTreeMap<String, SampleSequenceRecord>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub samples: SampleMap,
    pub errors: ErrorIndex,
}

impl Merge for ScanResult {
    fn merge(&mut self, other: Self) {
        self.samples.merge(other.samples);
        self.errors.merge(other.errors);
    }
}

pub fn scan(text: &str, filename: &str) -> ScanResult {
    let mut result = ScanResult::default();
    let lines: Vec<&str> = text.lines().collect();
    let mut cursor = 0;

    while let Some(header_idx) = next_header(&lines, cursor) {
        let name = parse_identifier(lines[header_idx]);
        if !is_valid_sample_id(name) {
            warn!(filename, identifier = name, "invalid sequence identifier");
            result.errors.record_invalid_name(filename);
            cursor = header_idx + 1;
            continue;
        }

        let end = next_header(&lines, header_idx + 1).unwrap_or(lines.len());
        let sequence: String = lines[header_idx + 1..end]
            .iter()
            .filter(|line| !line.is_empty())
            .copied()
            .collect();
        cursor = end;

        if sequence.is_empty() {
            debug!(filename, identifier = name, "identifier without sequence");
            continue;
        }
        result.samples.insert(
            name.to_string(),
            SampleSequenceRecord {
                sample_id: name.to_string(),
                filename: filename.to_string(),
                sequence,
            },
        );
    }

    debug!(filename, samples = result.samples.len(), "scanned sequence text");
    result
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn next_header(lines: &[&str], from: usize) -> Option<usize> {
    (from..lines.len()).find(|&idx| is_header(lines[idx]))
}

fn parse_identifier(line: &str) -> &str {
    line.trim_start()
        .strip_prefix('>')
        .unwrap_or_default()
        .trim_start_matches(' ')
}
