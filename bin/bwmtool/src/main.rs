use bwm::header::FileVersion;
use bwm::read::BwmReaderSettings;
use bwm::write::BwmWriterSettings;

use crate::prelude::*;

#[allow(unused_imports)]
mod prelude {
    pub use std::path::{Path, PathBuf};

    pub use anyhow::{Context, Result as AnyResult, bail};
}

mod cmd {
    pub mod convert;
    pub mod info;
    pub mod verify;
    #[cfg(feature = "obj")]
    pub mod from_obj;
}

#[derive(clap::Parser, Debug)]
#[command(about = "Tool for working with BWM model files.")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    /// Operation to perform
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Print extra info about what the tool is doing
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct WriteArgs {
    /// File format version to write (default: keep the input's)
    #[arg(long = "format-version", value_parser = parse_version)]
    version: Option<FileVersion>,
}

#[derive(clap::Args, Debug)]
struct ReadArgs {
    /// Fail if the size recorded in the header is wrong
    #[arg(long)]
    strict_size: bool,
    /// Ignore unexpected bytes at the end of the file
    #[arg(long)]
    allow_trailing: bool,
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// Overwrite output file if it exists
    #[arg(short, long)]
    overwrite: bool,
}

#[derive(clap::Args, Debug)]
struct InputPath {
    /// Path to the input file
    in_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct InputPaths {
    /// Path to the input files
    in_files: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct OutputPath {
    /// Path where to save the output file
    out_file: PathBuf,
}

#[derive(clap::Args, Debug)]
struct InOutPaths {
    /// Path to the input file
    in_file: PathBuf,
    /// Path to the output file (if unspecified, overwrite the input)
    out_file: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum CliCommand {
    /// Print information about the tool
    Version,
    /// Show general info about the file
    Info(cmd::info::InfoArgs),
    /// Try decoding the file to check for errors
    Verify(cmd::verify::VerifyArgs),
    /// Re-encode a file, optionally as another format version
    Convert(cmd::convert::ConvertArgs),
    /// Import from OBJ format, one input file per LOD (most detailed first)
    #[cfg(feature = "obj")]
    FromObj(cmd::from_obj::FromObjArgs),
}

fn parse_version(s: &str) -> Result<FileVersion, String> {
    let n: u32 = s.parse().map_err(|e| format!("{e}"))?;
    FileVersion::from_number(n).ok_or_else(|| {
        format!(
            "supported versions are {} to {}",
            bwm::MIN_FORMAT_VERSION,
            bwm::MAX_FORMAT_VERSION
        )
    })
}

impl From<&ReadArgs> for BwmReaderSettings {
    fn from(args: &ReadArgs) -> Self {
        Self {
            verify_file_size: args.strict_size,
            allow_trailing_data: args.allow_trailing,
        }
    }
}

impl From<&WriteArgs> for BwmWriterSettings {
    fn from(args: &WriteArgs) -> Self {
        Self {
            version: args.version,
        }
    }
}

fn load_model(rarg: &ReadArgs, path: &Path) -> AnyResult<bwm::Model> {
    let mut infile =
        std::fs::File::open(path).context("Could not open input file")?;
    bwm::read::read_from_with_settings(BwmReaderSettings::from(rarg), &mut infile)
        .context("Cannot decode file")
}

fn create_output(path: &Path, overwrite: bool) -> AnyResult<std::fs::File> {
    if overwrite {
        std::fs::File::create(path).context("Could not open output file")
    } else {
        std::fs::File::create_new(path).context("Could not open output file")
    }
}

fn run_command(cli: &Cli) -> AnyResult<()> {
    match &cli.command {
        CliCommand::Version => {
            // Verbose always prints version anyway
            if !cli.common.verbose {
                print_version();
            }
            Ok(())
        }
        CliCommand::Info(args) => cmd::info::run(&cli.common, args),
        CliCommand::Verify(args) => cmd::verify::run(&cli.common, args),
        CliCommand::Convert(args) => cmd::convert::run(&cli.common, args),
        #[cfg(feature = "obj")]
        CliCommand::FromObj(args) => cmd::from_obj::run(&cli.common, args),
    }
}

fn print_version() {
    eprintln!(
        "{} version {}. Works with file format versions {} to {}.",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        bwm::MIN_FORMAT_VERSION,
        bwm::MAX_FORMAT_VERSION,
    );
    eprintln!();
}

fn main() {
    use clap::Parser;
    let cli = Cli::parse();

    let level = if cli.common.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if cli.common.verbose {
        print_version();
    }

    if let Err(e) = run_command(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(2);
    }
}
