use std::path::PathBuf;

use crate::consts::{BUCKET_ENV_VAR, DEFAULT_BUCKET};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs as a KRM function: reads a ResourceList, appends the generated resources
    /// and writes it to stdout
    #[clap(visible_alias = "t")]
    Transform {
        /// The path to the ResourceList to read
        /// Reads from stdin if not set
        #[clap(short, long)]
        file: Option<PathBuf>,
    },
    /// Zips the source files of a service
    #[clap(visible_alias = "p")]
    Pack {
        /// The path to the service file
        service_file: PathBuf,
        /// The path of the archive to write
        /// Defaults to a timestamped file in the temp directory
        #[clap(short, long)]
        out: Option<PathBuf>,
        /// Do not print a summary
        #[clap(short, long)]
        quiet: bool,
    },
    /// Packs a service, uploads the archive and points the service file at it
    #[clap(visible_alias = "pu")]
    Publish {
        /// The path to the service file
        service_file: PathBuf,
        /// The bucket to upload the archive to
        #[clap(short, long, env = BUCKET_ENV_VAR, default_value = DEFAULT_BUCKET)]
        bucket: String,
    },
    /// Custom definition resource (CRD) commands
    #[clap(visible_alias = "c")]
    Crd {
        #[command(subcommand)]
        command: CrdCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum CrdCommands {
    /// Writes the Service CRD to a file
    #[clap(visible_alias = "w")]
    Write {
        /// The path to the file to write the CRD to
        #[clap(short, long)]
        file: PathBuf,
    },
    /// Prints the Service CRD to stdout
    #[clap(visible_alias = "p")]
    Print {},
}
