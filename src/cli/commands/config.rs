use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{CONFIG_PATH_ENV, Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file with defaults")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration and model paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, format),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(format),
    }
}

fn handle_init(force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default()
        .save()
        .context("failed to create config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path() {
        let state = if path.exists() { "" } else { " (not created, showing defaults)" };
        println!("# Config: {}{}", path.display(), state);
        println!();
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path(format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::config_path();
    let llm_dir = config.llm_model_dir();
    let embedding_dir = config.embedding_model_dir();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config_path,
            "config_exists": config_path.as_ref().is_some_and(|p| p.exists()),
            "llm_model_dir": llm_dir,
            "embedding_model_dir": embedding_dir,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let show = |label: &str, path: Option<std::path::PathBuf>| match path {
        Some(p) => {
            let marker = if p.exists() { "" } else { " (missing)" };
            println!("{:<17}{}{}", label, p.display(), marker);
        }
        None => println!("{:<17}<unknown>", label),
    };

    println!("Configuration paths:");
    println!();
    show("Config:", config_path);
    show("Language model:", llm_dir);
    show("Embedding model:", embedding_dir);

    if std::env::var(CONFIG_PATH_ENV).is_ok() {
        println!();
        println!("(config path overridden by {CONFIG_PATH_ENV})");
    }
    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        }
    }

    Ok(())
}
