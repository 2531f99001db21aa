//! feedme-relay: WhatsApp webhook relay binary
//!
//! Usage:
//!   feedme-relay                   - Start the webhook server
//!   feedme-relay --config <path>   - Start with an explicit TOML config file
//!   feedme-relay --help            - Show help

use std::path::PathBuf;

use fm_core::Config;
use fm_whatsapp::WhatsAppBot;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq)]
enum RunMode {
    /// Webhook server, optionally with an explicit config file
    Server { config_path: Option<PathBuf> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1))?;

    let config_path = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("feedme-relay {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server { config_path } => config_path,
    };

    // Load .env file before logging so RUST_LOG may come from it
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let config = Config::load(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting feedme-relay...");
    tracing::info!("Reply policy: {:?}", config.relay.reply_policy);

    let bot = WhatsAppBot::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create WhatsApp relay: {}", e))?;

    tracing::info!("Press Ctrl+C to exit");

    bot.start(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("WhatsApp relay error: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}

/// `RUST_LOG` directives when set and valid, `info` otherwise
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Parse command line arguments (without the program name)
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(RunMode::Server { config_path })
}

/// Print help message
fn print_help() {
    println!("feedme-relay - WhatsApp webhook relay");
    println!();
    println!("Usage:");
    println!("  feedme-relay                  Start the webhook server");
    println!("  feedme-relay --config <path>  Load settings from a TOML file");
    println!("  feedme-relay --help           Show this help message");
    println!("  feedme-relay --version        Show version");
    println!();
    println!("Without --config, ./{} is used when present.", fm_core::config::DEFAULT_CONFIG_FILE);
    println!();
    println!("Environment Variables:");
    println!("  PORT                   Listen port (default: 8080)");
    println!("  WHATSAPP_TOKEN         Cloud API access token");
    println!("  WHATSAPP_PHONE_ID      Business phone number id");
    println!("  WHATSAPP_VERIFY_TOKEN  Webhook verification secret");
    println!("  WHATSAPP_APP_SECRET    App secret for payload signatures (optional)");
    println!("  REPLY_POLICY           welcome, echo or completion (default: welcome)");
    println!("  PAYLOAD_SHAPE          nested or flat (default: nested)");
    println!("  LLM_API_KEY            Completion API key");
    println!("  LLM_MODEL              Model name (default: claude-sonnet-4-20250514)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_is_server() {
        assert_eq!(parse_args(args(&[])).unwrap(), RunMode::Server { config_path: None });
    }

    #[test]
    fn test_config_path() {
        assert_eq!(
            parse_args(args(&["--config", "relay.toml"])).unwrap(),
            RunMode::Server {
                config_path: Some(PathBuf::from("relay.toml"))
            }
        );
        assert!(parse_args(args(&["--config"])).is_err());
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(args(&["-h"])).unwrap(), RunMode::Help);
        assert_eq!(parse_args(args(&["--version"])).unwrap(), RunMode::Version);
    }

    #[test]
    fn test_unknown_argument() {
        assert!(parse_args(args(&["--cli"])).is_err());
    }

    #[test]
    fn test_log_filter_keeps_explicit_level() {
        assert_eq!(log_filter(Some("debug")).to_string(), "debug");
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
        assert_eq!(log_filter(None).to_string(), "info");
    }
}
