#![allow(dead_code)]

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use pathogen_upload::domain::CanonicalLocation;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// In-memory zip archive built entry by entry.
pub struct ZipBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn file(mut self, name: &str, content: impl AsRef<[u8]>) -> Self {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(content.as_ref()).unwrap();
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

pub fn gzip_bytes(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

fn level(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Small gazetteer: two counties, then the division, country and region
/// they roll up to, then an unrelated country.
pub fn reference_locations() -> Vec<CanonicalLocation> {
    vec![
        CanonicalLocation::new(
            1,
            level("North America"),
            level("USA"),
            level("California"),
            level("Alameda County"),
        ),
        CanonicalLocation::new(
            2,
            level("North America"),
            level("USA"),
            level("California"),
            level("San Francisco County"),
        ),
        CanonicalLocation::new(
            3,
            level("North America"),
            level("USA"),
            level("California"),
            None,
        ),
        CanonicalLocation::new(4, level("North America"), level("USA"), None, None),
        CanonicalLocation::new(5, level("North America"), None, None, None),
        CanonicalLocation::new(6, level("Europe"), level("France"), None, None),
    ]
}
