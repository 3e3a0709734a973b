//! Decoding of uploaded sequence files.
//!
//! Dispatch is by filename suffix: zip archives are unpacked and each entry
//! decoded again, gzip streams are inflated and scanned as text, plain text
//! suffixes are scanned directly. Anything else is reported as
//! `UNRECOGNIZED_FORMAT` and contributes no samples.

use std::io::{Cursor, Read};

use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::IngestError;
use crate::fasta::{self, ScanResult};
use crate::report::Merge;

/// Nested archives beyond this depth are not descended into.
pub const MAX_ARCHIVE_DEPTH: usize = 8;

const TEXT_SUFFIXES: [&str; 3] = [".fasta", ".fa", ".txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Zip,
    Gzip,
    Text,
    Unrecognized,
}

impl ContainerKind {
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            ContainerKind::Zip
        } else if lower.ends_with(".gz") {
            ContainerKind::Gzip
        } else if TEXT_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
            ContainerKind::Text
        } else {
            ContainerKind::Unrecognized
        }
    }
}

/// Archive entries created by operating systems rather than users.
pub fn is_junk_entry(name: &str) -> bool {
    let basename = name.rsplit('/').next().unwrap_or(name);
    name.starts_with("__MACOSX/") || name.contains("/__MACOSX/") || basename == ".DS_Store"
}

/// Decodes one upload. Corrupt archives and unsupported entries are
/// recorded as `UNRECOGNIZED_FORMAT` and their siblings are still decoded.
pub fn decode(filename: &str, bytes: &[u8]) -> ScanResult {
    decode_at_depth(filename, bytes, 0)
}

fn decode_at_depth(filename: &str, bytes: &[u8], depth: usize) -> ScanResult {
    let kind = ContainerKind::from_filename(filename);
    debug!(filename, ?kind, depth, "decoding upload");
    let decoded = match kind {
        ContainerKind::Zip if depth < MAX_ARCHIVE_DEPTH => decode_zip(filename, bytes, depth),
        ContainerKind::Gzip => {
            inflate_gzip(filename, bytes).map(|text| fasta::scan(&text, filename))
        }
        ContainerKind::Text => Ok(fasta::scan(&String::from_utf8_lossy(bytes), filename)),
        ContainerKind::Zip | ContainerKind::Unrecognized => {
            warn!(filename, "unrecognized sequence file format");
            return unrecognized(filename);
        }
    };
    decoded.unwrap_or_else(|err| {
        warn!(filename, error = %err, "skipping undecodable sequence file");
        unrecognized(filename)
    })
}

fn unrecognized(filename: &str) -> ScanResult {
    let mut result = ScanResult::default();
    result.errors.record_unrecognized_format(filename);
    result
}

fn decode_zip(filename: &str, bytes: &[u8], depth: usize) -> Result<ScanResult, IngestError> {
    let decompress_err = |err: zip::result::ZipError| IngestError::Decompress {
        filename: filename.to_string(),
        message: err.to_string(),
    };
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(decompress_err)?;

    let mut result = ScanResult::default();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(filename, index = i, error = %err, "skipping unreadable archive entry");
                result.errors.record_unrecognized_format(format!("{filename}#{i}"));
                continue;
            }
        };
        let name = entry.name().to_string();
        if entry.is_dir() || is_junk_entry(&name) {
            continue;
        }
        let mut content = Vec::new();
        if let Err(err) = entry.read_to_end(&mut content) {
            warn!(filename, entry = %name, error = %err, "skipping unreadable archive entry");
            result.errors.record_unrecognized_format(name);
            continue;
        }
        result.merge(decode_at_depth(&name, &content, depth + 1));
    }
    Ok(result)
}

fn inflate_gzip(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut content = Vec::new();
    decoder
        .read_to_end(&mut content)
        .map_err(|err| IngestError::Decompress {
            filename: filename.to_string(),
            message: err.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_by_suffix() {
        assert_eq!(ContainerKind::from_filename("batch.ZIP"), ContainerKind::Zip);
        assert_eq!(ContainerKind::from_filename("a.fasta.gz"), ContainerKind::Gzip);
        assert_eq!(ContainerKind::from_filename("a.Fa"), ContainerKind::Text);
        assert_eq!(ContainerKind::from_filename("notes.txt"), ContainerKind::Text);
        assert_eq!(ContainerKind::from_filename("a.docx"), ContainerKind::Unrecognized);
    }

    #[test]
    fn junk_entries() {
        assert!(is_junk_entry("__MACOSX/._a.fasta"));
        assert!(is_junk_entry("batch/.DS_Store"));
        assert!(is_junk_entry(".DS_Store"));
        assert!(!is_junk_entry("batch/a.fasta"));
    }

    #[test]
    fn unrecognized_suffix_records_filename() {
        let result = decode("sheet.xlsx", b">a\nACGT\n");
        assert!(result.samples.is_empty());
        assert!(
            result
                .errors
                .contains(crate::report::ErrorCode::UnrecognizedFormat)
        );
    }
}
