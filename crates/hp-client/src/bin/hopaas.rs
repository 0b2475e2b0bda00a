use clap::{Parser, Subcommand};
use hp_client::{Client, ClientConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hopaas", about = "Hyperparameter Optimization as a Service client")]
struct Cli {
    /// Config file (defaults to ~/.hopaasrc)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Server URL, overriding the config file
    #[arg(long, global = true, requires = "token")]
    server: Option<String>,

    /// API token, overriding the config file
    #[arg(long, global = true, requires = "server")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prompt for server and token, then write the config file
    Configure,
    /// Print the backend version
    Version,
    /// Print the id of the best trial of a study
    Best { study_id: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    if let Command::Configure = cli.command {
        let stdin = std::io::stdin();
        let config =
            ClientConfig::load_or_prompt(&path, true, &mut stdin.lock(), &mut std::io::stdout())?;
        println!("Configured {}", config.server_url());
        return Ok(());
    }

    let client = match (cli.server, cli.token) {
        (Some(server), Some(token)) => Client::new(server, token),
        _ => Client::from_config_file(Some(&path), false)?,
    };

    match cli.command {
        Command::Version => println!("{}", client.backend_version()?),
        Command::Best { study_id } => println!("{}", client.get_best_trial(&study_id, 0)?),
        Command::Configure => {}
    }
    Ok(())
}
