use anyhow::Result as AnyResult;
use clap::Parser;
use serverless_krm::{
    cli::{Cli, Commands, CrdCommands},
    main_actions::{
        pack_service, print_crd, publish_service, transform_resource_list, write_crd_to_file,
    },
};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr, stdout carries the command output.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "serverless_krm=info");
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

async fn run(command: Commands) -> AnyResult<()> {
    match command {
        Commands::Transform { file } => transform_resource_list(file).await,
        Commands::Pack {
            service_file,
            out,
            quiet,
        } => pack_service(service_file, out, quiet).await,
        Commands::Publish {
            service_file,
            bucket,
        } => publish_service(service_file, bucket).await,
        Commands::Crd { command } => match command {
            CrdCommands::Print {} => print_crd(),
            CrdCommands::Write { file } => write_crd_to_file(file).await,
        },
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(error) = run(cli.command).await {
        tracing::error!(%error, "Command failed");
        eprintln!("Error: {:?}", error);
        std::process::exit(1);
    }
}
