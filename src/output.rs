use std::io::{self, Write};

use serde::Serialize;

use crate::fasta::ScanResult;
use crate::ingest::UploadReport;
use crate::metadata::MetadataParseResult;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    generated_at: String,
    #[serde(flatten)]
    result: &'a T,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sequences(result: &ScanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_metadata(result: &MetadataParseResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_check(result: &UploadReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn render<T: Serialize>(value: &T) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Envelope {
            generated_at: chrono::Utc::now().to_rfc3339(),
            result: value,
        })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::render(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
