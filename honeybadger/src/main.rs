//! honeybadger - CLI tool for checking a Honeybadger setup
//!
//! This tool provides commands for:
//! - Showing the resolved configuration and where notices would go
//! - Sending a one-off notice to verify the API key and endpoint
//!
//! Configuration is read from, lowest precedence first:
//! - $XDG_CONFIG_HOME/honeybadger/config.toml (or `--config`)
//! - HONEYBADGER_* environment variables
//! - command-line flags

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use honeybadger_core::{ConfigOverrides, Configuration, Context, ErrorSource, Notifier, Route};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "honeybadger")]
#[command(about = "Check Honeybadger configuration and send test notices")]
#[command(version)]
struct Args {
    /// Verbose output (debug logging to stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/honeybadger/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API key
    #[arg(long)]
    api_key: Option<String>,

    /// Override the environment name
    #[arg(long)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the resolved configuration and delivery route
    Status,

    /// Send one notice and print its id
    Notify {
        /// Error class to report
        #[arg(long, default_value = "HoneybadgerTest")]
        class: String,

        /// Error message to report
        #[arg(long, default_value = "Test notice from the honeybadger CLI")]
        message: String,

        /// Context entry as key=value (value parsed as JSON when possible)
        #[arg(long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,

        /// Deliver even from a development-like environment
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        honeybadger_core::logging::init("debug").context("failed to initialize logging")?;
    }

    let config = load_config(&args)?;

    match args.command {
        Command::Status => cmd_status(&config),
        Command::Notify {
            class,
            message,
            context,
            force,
        } => cmd_notify(config, class, message, &context, force),
    }
}

fn load_config(args: &Args) -> Result<Configuration> {
    let base = match &args.config {
        Some(path) => Configuration::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Configuration::load().context("failed to load configuration")?,
    };

    let config = base.resolve(&ConfigOverrides {
        api_key: args.api_key.clone(),
        environment: args.environment.clone(),
        ..Default::default()
    });
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn cmd_status(config: &Configuration) -> Result<()> {
    println!("Honeybadger Configuration");
    println!("=========================");
    println!();
    println!(
        "API Key:         {}",
        config
            .redacted()
            .api_key
            .unwrap_or_else(|| "<not set>".to_string())
    );
    println!("Endpoint:        {}", config.endpoint);
    println!("Environment:     {}", config.environment);
    println!("Force Report:    {}", config.force_report_data);
    println!("Hostname:        {}", config.hostname);
    println!("Project Root:    {}", config.project_root);
    println!("Timeout:         {}s", config.timeout_secs);

    let excluded: Vec<&str> = config
        .excluded_exceptions
        .iter()
        .map(String::as_str)
        .collect();
    println!(
        "Excluded:        {}",
        if excluded.is_empty() {
            "<none>".to_string()
        } else {
            excluded.join(", ")
        }
    );

    println!();
    match Route::for_config(config) {
        Route::Real => {
            if config.api_key.is_some() {
                println!("Status: Reporting to {}", config.endpoint);
            } else {
                println!("Status: Reporting enabled but api_key is missing");
            }
        }
        Route::Fake => {
            println!("Status: Development mode (notices are logged, not sent)");
        }
    }

    Ok(())
}

fn cmd_notify(
    config: Configuration,
    class: String,
    message: String,
    entries: &[String],
    force: bool,
) -> Result<()> {
    let context = parse_context(entries)?;

    let config = if force {
        config.resolve(&ConfigOverrides {
            force_report_data: Some(true),
            ..Default::default()
        })
    } else {
        config
    };

    if config.is_excluded(&class) {
        println!("{} is in excluded_exceptions; nothing sent.", class);
        return Ok(());
    }

    let route = Route::for_config(&config);
    tracing::debug!(?route, class = %class, "Sending test notice");
    let notifier = Notifier::new(config);

    match notifier.notify(ErrorSource::explicit(class, message), context) {
        Some(id) => println!("Notice sent: {}", id),
        None if route == Route::Fake => {
            println!("Development mode: notice logged, not sent (use --force to deliver)")
        }
        None => bail!("notice was not accepted; run with --verbose for details"),
    }

    Ok(())
}

fn parse_context(entries: &[String]) -> Result<Context> {
    let mut context = Context::new();
    for entry in entries {
        let Some((key, raw)) = entry.split_once('=') else {
            bail!("invalid --context {:?}: expected KEY=VALUE", entry);
        };
        if key.is_empty() {
            bail!("invalid --context {:?}: empty key", entry);
        }
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        context.insert(key.to_string(), value);
    }
    Ok(context)
}
