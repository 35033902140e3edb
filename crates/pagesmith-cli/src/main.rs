mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{fingerprint::FingerprintArgs, generate::GenerateArgs, serve::ServeArgs};

#[derive(Parser)]
#[command(
    name = "pagesmith",
    about = "Generate, update and deploy small static web apps from a brief",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the deployment webhook
    Serve(ServeArgs),

    /// Run one round locally, without publishing
    Generate(GenerateArgs),

    /// Print the design fingerprint of a site directory
    Fingerprint(FingerprintArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => cmd::serve::run(args),
        Commands::Generate(args) => cmd::generate::run(args, cli.json),
        Commands::Fingerprint(args) => cmd::fingerprint::run(args, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
