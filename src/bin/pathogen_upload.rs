use std::fs;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pathogen_upload::config::{ConfigLoader, ResolvedConfig, load_locations};
use pathogen_upload::domain::SequenceFile;
use pathogen_upload::error::IngestError;
use pathogen_upload::ingest::{
    build_location_resolver, check_upload, ingest_metadata_file, ingest_sequence_files,
};
use pathogen_upload::location::LocationResolver;
use pathogen_upload::output::JsonOutput;

#[derive(Parser)]
#[command(name = "pathogen-upload")]
#[command(about = "Validate pathogen sequence and metadata uploads before submission")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Decode sequence files (FASTA, .gz, .zip) and list their samples")]
    Sequences(SequencesArgs),
    #[command(about = "Parse a CSV/TSV metadata file")]
    Metadata(MetadataArgs),
    #[command(about = "Parse sequences and metadata together and cross-check sample IDs")]
    Check(CheckArgs),
}

#[derive(Args)]
struct SequencesArgs {
    #[arg(required = true)]
    files: Vec<Utf8PathBuf>,
}

#[derive(Args, Clone)]
struct SessionArgs {
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// JSON array of reference locations; overrides the config file
    #[arg(long)]
    locations: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct MetadataArgs {
    file: Utf8PathBuf,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long)]
    metadata: Utf8PathBuf,

    #[arg(required = true)]
    files: Vec<Utf8PathBuf>,

    #[command(flatten)]
    session: SessionArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<IngestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &IngestError) -> u8 {
    match error {
        IngestError::ConfigRead(_)
        | IngestError::ConfigParse(_)
        | IngestError::LocationsRead(_)
        | IngestError::LocationsParse(_)
        | IngestError::UnknownField(_) => 2,
        IngestError::Decompress { .. } | IngestError::Metadata { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sequences(args) => {
            let files = read_files(&args.files)?;
            let result = ingest_sequence_files(&files);
            JsonOutput::print_sequences(&result).into_diagnostic()
        }
        Commands::Metadata(args) => {
            let (config, resolver) = open_session(&args.session)?;
            let file = read_file(&args.file)?;
            let mut cache = resolver.new_cache();
            let result = ingest_metadata_file(&file, &config.rules, &resolver, &mut cache)?;
            JsonOutput::print_metadata(&result).into_diagnostic()
        }
        Commands::Check(args) => {
            let (config, resolver) = open_session(&args.session)?;
            let metadata = read_file(&args.metadata)?;
            let files = read_files(&args.files)?;
            let report = check_upload(&files, &metadata, &config.rules, &resolver)?;
            if report.has_blocking_errors() {
                info!("upload has blocking errors; fix the files and re-upload");
            }
            JsonOutput::print_check(&report).into_diagnostic()
        }
    }
}

fn open_session(args: &SessionArgs) -> Result<(ResolvedConfig, LocationResolver), IngestError> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;
    let locations = match args.locations.as_ref().or(config.locations.as_ref()) {
        Some(path) => load_locations(path)?,
        None => Vec::new(),
    };
    info!(locations = locations.len(), "loaded location reference set");
    let resolver = build_location_resolver(locations);
    Ok((config, resolver))
}

fn read_files(paths: &[Utf8PathBuf]) -> Result<Vec<SequenceFile>, IngestError> {
    paths.iter().map(|path| read_file(path)).collect()
}

fn read_file(path: &Utf8Path) -> Result<SequenceFile, IngestError> {
    let bytes = fs::read(path.as_std_path())
        .map_err(|err| IngestError::Filesystem(format!("read {path}: {err}")))?;
    let filename = path.file_name().unwrap_or(path.as_str());
    Ok(SequenceFile::new(filename, bytes))
}
