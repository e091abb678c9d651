//! streamarc CLI
//!
//! Reads ZIP and TAR archives in fixed-size chunks, the way they would
//! arrive over a network, and writes STORE-only ZIP archives.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{ExtractOptions, ListOptions, StreamOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streamarc")]
#[command(author, version, about = "Streaming ZIP/TAR reader and STORE-only ZIP writer")]
#[command(long_about = "
streamarc reads archives incrementally: the file is fed to the decoder in
chunks and entries are emitted as soon as their bytes have arrived.

Examples:
  streamarc list book.cbz
  streamarc extract book.cbz -o pages --include '*.png'
  streamarc extract book.cbz --json --chunk-size 4096
  streamarc create out.zip notes.txt images/
  streamarc detect mystery.bin
")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Show sizes and totals
        #[arg(short, long)]
        long: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Extract the entries of an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Print every event as a JSON line instead of writing files
        #[arg(short, long)]
        json: bool,

        /// Show a progress bar
        #[arg(short = 'P', long)]
        progress: bool,

        #[command(flatten)]
        stream: StreamArgs,
    },

    /// Create a STORE-only ZIP archive
    #[command(alias = "c")]
    Create {
        /// Output archive file
        archive: PathBuf,

        /// Files and directories to add
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Number of files handed to the compressor per batch
        #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u16).range(1..))]
        batch_size: u16,
    },

    /// Identify a file by its magic bytes
    Detect {
        /// File to inspect
        file: PathBuf,
    },
}

/// Options shared by the commands that read an archive.
#[derive(clap::Args)]
struct StreamArgs {
    /// Bytes read from the file per update
    #[arg(long, default_value_t = 64 * 1024, value_parser = clap::value_parser!(u32).range(1..))]
    chunk_size: u32,

    /// Do not verify entry CRC-32 values
    #[arg(long)]
    no_verify: bool,

    /// Report parser diagnostics as info events
    #[arg(long)]
    debug: bool,
}

impl From<StreamArgs> for StreamOptions {
    fn from(args: StreamArgs) -> Self {
        Self {
            chunk_size: args.chunk_size as usize,
            verify_crc: !args.no_verify,
            debug: args.debug,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    utils::init_logger(cli.verbose);

    let result = match cli.command {
        Commands::List {
            archive,
            long,
            json,
            include,
            exclude,
            stream,
        } => commands::cmd_list(
            &archive,
            &ListOptions {
                long,
                json,
                include: &include,
                exclude: &exclude,
                stream: stream.into(),
            },
        ),
        Commands::Extract {
            archive,
            output,
            include,
            exclude,
            json,
            progress,
            stream,
        } => commands::cmd_extract(
            &archive,
            &ExtractOptions {
                output: &output,
                include: &include,
                exclude: &exclude,
                json,
                progress,
                stream: stream.into(),
            },
        ),
        Commands::Create {
            archive,
            files,
            batch_size,
        } => commands::cmd_create(&archive, &files, usize::from(batch_size)),
        Commands::Detect { file } => commands::cmd_detect(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
