use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use slipscan_cli::config::{self, Config};
use slipscan_cli::error::ApiError;
use slipscan_cli::image::ImagePayload;
use slipscan_cli::logging::init_tracing;
use slipscan_cli::server::{AppState, ExtractRequest, app_router, extract_transactions};
use slipscan_cli::llm::HttpTransport;
use slipscan_finance::normalize_model_output;
use slipscan_ingest::NormalizeOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "slipscan",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SLIPSCAN_BUILD_SHA"), ")"),
    about = "Extract transactions from bank and receipt screenshots"
)]
struct Cli {
    /// Config file (defaults to $SLIPSCAN_CONFIG or ./slipscan.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP extraction endpoint
    Serve {
        /// Override server.listen_addr
        #[arg(long, env = "SLIPSCAN_LISTEN_ADDR")]
        listen: Option<String>,
    },

    /// Send a local image through the provider chain and print the transactions
    Extract {
        #[arg(long)]
        image: PathBuf,

        /// Comma-separated ledger members
        #[arg(long, value_delimiter = ',')]
        members: Vec<String>,

        #[arg(long)]
        currency: Option<String>,

        /// Extra instructions for the model
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Normalize raw model text (file or stdin) without calling any provider
    Normalize {
        /// Defaults to stdin
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long, value_delimiter = ',')]
        members: Vec<String>,
    },

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config_path = config::config_path(cli.config.as_deref());

    match cli.command {
        Command::Serve { listen } => {
            let mut cfg = config::load_config(&config_path)?;
            if let Some(addr) = listen {
                cfg.server.listen_addr = addr;
            }
            serve(cfg).await?;
        }

        Command::Extract {
            image,
            members,
            currency,
            prompt,
        } => {
            let cfg = config::load_config(&config_path)?;
            extract_file(&cfg, &image, members, currency, prompt).await?;
        }

        Command::Normalize { input, members } => {
            let raw = read_input(input.as_deref())?;
            let opts = NormalizeOptions::default().with_members(members);
            let txns = normalize_model_output(&raw, &opts);
            println!("{}", serde_json::to_string_pretty(&txns)?);
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(&config_path)?,
            ConfigCommand::Show => {
                let cfg = config::load_config(&config_path)?;
                println!("# {}", config_path.display());
                println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

async fn serve(cfg: Config) -> Result<()> {
    let addr = cfg.listen_addr()?;
    let providers = cfg.resolve_providers();
    if providers.is_empty() {
        warn!("no provider credentials found; POST requests will fail until one is set");
    } else {
        let names: Vec<_> = providers.iter().map(|p| p.source()).collect();
        info!(providers = ?names, "provider chain ready");
    }

    let transport = Arc::new(HttpTransport::new(cfg.upstream_timeout())?);
    let state = Arc::new(AppState::new(providers, transport));
    let router = app_router(state, cfg.server.max_body_bytes);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn extract_file(
    cfg: &Config,
    image: &Path,
    members: Vec<String>,
    currency: Option<String>,
    prompt: Option<String>,
) -> Result<()> {
    let bytes = std::fs::read(image).with_context(|| format!("read {}", image.display()))?;
    let payload = ImagePayload::from_bytes(bytes)?;

    let providers = cfg.resolve_providers();
    let transport = HttpTransport::new(cfg.upstream_timeout())?;
    let req = ExtractRequest {
        image: Some(payload.data_url()),
        prompt,
        members: Some(members),
        currency,
    };

    let resp = extract_transactions(&providers, &transport, req, slipscan_core::today_local())
        .await
        .map_err(|e| match e {
            ApiError::Upstream {
                message, details, ..
            } => anyhow!("{message}: {details}"),
            other => anyhow!(other),
        })?;

    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("read {}", p.display())),
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .context("read stdin")?;
            Ok(s)
        }
    }
}
