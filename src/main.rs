use clap::{Parser, Subcommand};
use colored::*;
use anyhow::Result;

mod app;
mod chat_api;
mod config;
mod conversation;
mod error;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use chat_api::ChatClient;
use config::Config;
use conversation::{ConversationView, ErrorPolicy, Role};

#[derive(Parser)]
#[command(name = "gaiasage")]
#[command(about = "Terminal chat client for the GaiaSage geospatial analysis co-pilot")]
struct Cli {
    /// Base URL of the chat endpoint (overrides config)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Show detailed errors in the transcript regardless of host
    #[arg(long, global = true, conflicts_with = "no_dev")]
    dev: bool,

    /// Always show the generic error message
    #[arg(long, global = true)]
    no_dev: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat,
    /// Send one message and print the conversation
    Send {
        /// Message text
        message: String,
    },
    /// Check the backend health endpoint
    Health,
    /// Show configuration, or save --endpoint as the default
    Config {
        /// Persist the --endpoint value
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_error) = Config::load_or_default();

    let log_level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    // Logging is best-effort; the client still works without a log file
    let log_path = logging::init(log_level).ok();
    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
    }

    let endpoint = cli.endpoint.clone().unwrap_or_else(|| config.endpoint().to_string());
    let client = ChatClient::new(&endpoint);
    let policy = error_policy(&cli, &config, &client);
    tracing::info!(endpoint = %endpoint, ?policy, "starting");

    match cli.command {
        None | Some(Commands::Chat) => run_tui(client, policy).await?,
        Some(Commands::Send { message }) => send_once(&client, policy, &message).await,
        Some(Commands::Health) => check_health(&client).await?,
        Some(Commands::Config { save }) => show_config(&config, cli.endpoint.as_deref(), save, log_path)?,
    }

    Ok(())
}

fn error_policy(cli: &Cli, config: &Config, client: &ChatClient) -> ErrorPolicy {
    let forced = if cli.dev {
        Some(true)
    } else if cli.no_dev {
        Some(false)
    } else {
        config.dev_mode
    };

    match forced {
        Some(true) => ErrorPolicy::Detailed,
        Some(false) => ErrorPolicy::Generic,
        None => ErrorPolicy::for_host(client.host().as_deref()),
    }
}

async fn run_tui(client: ChatClient, policy: ErrorPolicy) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(ConversationView::new(policy), client, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn send_once(client: &ChatClient, policy: ErrorPolicy, message: &str) {
    let mut view = ConversationView::new(policy);
    view.set_draft(message);

    if !view.can_submit() {
        println!("{}", "Nothing to send".yellow());
        return;
    }

    println!("🛰️  Sending to {}...\n", client.chat_url().dimmed());
    view.submit(client).await;

    for turn in view.transcript() {
        match turn.role {
            Role::User => println!("{}\n{}\n", "You:".bold().cyan(), turn.content),
            Role::Assistant => println!("{}\n{}\n", "GaiaSage:".bold().green(), turn.content),
        }
    }
}

async fn check_health(client: &ChatClient) -> Result<()> {
    match client.health().await {
        Ok(health) => {
            println!("{} {}", "Status:".bold(), health.status.green());
            let key_status = if health.api_key_configured {
                "configured".green()
            } else {
                "missing".red()
            };
            println!("{} {}", "API key:".bold(), key_status);
        }
        Err(e) => {
            println!("{}: {}", "Error contacting backend".red(), e);
            println!("Checked: {}", client.base_url().bold());
        }
    }
    Ok(())
}

fn show_config(
    config: &Config,
    endpoint: Option<&str>,
    save: bool,
    log_path: Option<std::path::PathBuf>,
) -> Result<()> {
    if save {
        match endpoint {
            Some(endpoint) => {
                Config::save_endpoint(endpoint)?;
                println!("Saved endpoint {}", endpoint.green());
            }
            None => println!("{}", "Pass --endpoint <URL> to save a new default".yellow()),
        }
        return Ok(());
    }

    println!("{} {}", "Config file:".bold(), Config::get_config_path()?.display());
    println!("{} {}", "Endpoint:".bold(), config.endpoint());
    let dev_mode = match config.dev_mode {
        Some(true) => "on",
        Some(false) => "off",
        None => "auto (localhost)",
    };
    println!("{} {}", "Dev mode:".bold(), dev_mode);
    if let Some(path) = log_path {
        println!("{} {}", "Log file:".bold(), path.display());
    }
    Ok(())
}
