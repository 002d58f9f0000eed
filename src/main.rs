//! Mindly CLI entry point

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mindly::agent::{AgentService, GeminiClient, StreamChunk};
use mindly::auth::{CredentialStore, Credentials, FileCredentialStore, GoogleAuthProvider};
use mindly::classroom::DownloadLinks;
use mindly::config::{self, Config};
use mindly::google::GoogleClient;
use mindly::server::{self, AppState};
use mindly::ui;

#[derive(Parser)]
#[command(name = "mindly")]
#[command(about = "Mindly - Classroom-aware tutoring agent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default ~/.mindly/config.json
    Onboard,

    /// Start the HTTP API
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Ask the agent one question on behalf of a user
    Ask {
        /// User whose Classroom is queried
        #[arg(short, long)]
        user: String,

        /// Print the answer as it is produced
        #[arg(short, long)]
        stream: bool,

        /// The question
        query: String,
    },

    /// Store Google tokens for a user
    Connect {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: Option<String>,

        /// Seconds until the access token expires
        #[arg(long)]
        expires_in: Option<i64>,
    },

    /// Remove a user's stored Google tokens
    Disconnect {
        #[arg(short, long)]
        user: String,
    },

    /// Show Mindly status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mindly=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load()?;

    match cli.command {
        Commands::Onboard => {
            let path = config::config_path();
            if path.exists() {
                ui::print_warning(&format!("Config already exists at {}", path.display()));
            } else {
                config::save(&Config::default())?;
                ui::print_success(&format!("Wrote {}", path.display()));
            }
            println!("\nNext steps:");
            println!("  1. Add your Gemini API key and server.api_keys to the config");
            println!("  2. Store Google tokens: mindly connect --user <id> --access-token <token>");
            println!("  3. Ask: mindly ask --user <id> \"What's due tomorrow?\"");
        }

        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            run_server(&config, &bind).await?;
        }

        Commands::Ask { user, stream, query } => {
            run_ask(&config, &user, &query, stream).await?;
        }

        Commands::Connect {
            user,
            access_token,
            refresh_token,
            expires_in,
        } => {
            let store = FileCredentialStore::new(config.credentials_path.clone());
            let credentials = Credentials::new(access_token, refresh_token, expires_in);
            store.save(&user, &credentials).await?;
            ui::print_success(&format!(
                "Stored Google credentials for {} in {}",
                user,
                config.credentials_path.display()
            ));
        }

        Commands::Disconnect { user } => {
            let store: Arc<dyn CredentialStore> =
                Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
            GoogleAuthProvider::new(config.google.clone(), store)
                .disconnect(&user)
                .await?;
            ui::print_success(&format!("Removed Google credentials for {}", user));
        }

        Commands::Status => {
            ui::print_header(&config.model, &config.server.bind);
            println!("Config: {}", config::config_path().display());
            println!("Gemini API key: {}", ui::flag(!config.gemini_api_key.is_empty()));
            println!(
                "Google OAuth client: {}",
                ui::flag(!config.google.client_id.is_empty() && !config.google.client_secret.is_empty())
            );
            println!("Credentials: {}", config.credentials_path.display());
            println!("API keys: {}", config.server.api_keys.len());
            println!("Download secret: {}", ui::flag(!config.download.secret.is_empty()));
            println!("Max iterations: {}", config.max_iterations);
        }
    }

    Ok(())
}

/// Wire the Gemini client, Google client and signer into one service.
fn build_service(config: &Config) -> Result<(Arc<AgentService>, Arc<DownloadLinks>)> {
    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
    let auth = GoogleAuthProvider::new(config.google.clone(), store);
    let google = Arc::new(GoogleClient::new(auth));
    let llm = Arc::new(GeminiClient::from_config(config)?);
    let links = Arc::new(DownloadLinks::new(
        &config.download.secret,
        config.download.ttl_secs,
    ));

    let service = AgentService::new(llm, google.clone(), google, links.clone(), config);
    Ok((Arc::new(service), links))
}

async fn run_server(config: &Config, bind: &str) -> Result<()> {
    if config.server.api_keys.is_empty() {
        ui::print_warning("No API keys configured (server.api_keys); every request will be rejected");
    }

    let (service, links) = build_service(config)?;
    let state = AppState::new(service, links, config.server.api_keys.clone());

    ui::print_header(&config.model, bind);
    ui::print_step(&format!("Serving the agent API on {}", bind));
    server::serve(state, bind).await?;
    Ok(())
}

async fn run_ask(config: &Config, user: &str, query: &str, stream: bool) -> Result<()> {
    let (service, _) = build_service(config)?;

    if !stream {
        let response = service.process_query(user, query, &[]).await;
        if !response.success {
            ui::print_error(response.error.as_deref().unwrap_or("Query failed"));
            return Ok(());
        }

        println!("\n{}\n", response.answer);
        for file in response.files.iter().flatten() {
            ui::print_file(file);
        }
        return Ok(());
    }

    let mut files = Vec::new();
    let result = service
        .process_query_stream(user, query, &[], |chunk| match chunk {
            StreamChunk::Content { content } => {
                print!("{}", content);
                let _ = std::io::stdout().flush();
            }
            StreamChunk::Thinking { action, .. } => ui::print_thinking(&action),
            StreamChunk::Files { files: found } => files = found,
            StreamChunk::Error { error } => ui::print_error(&error),
        })
        .await;
    println!();

    match result {
        Ok(()) => {
            for file in &files {
                ui::print_file(file);
            }
        }
        Err(e) => ui::print_error(&e.to_string()),
    }
    Ok(())
}
