use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use weather_core::{
    Config, CredentialSources, FileStore, KeyValueStore, SearchController, Settings,
    WeatherApiProvider,
};

use crate::{interactive, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for a city")]
pub struct Cli {
    /// API key to use for this run. Build-time and environment keys take precedence.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Request timeout in seconds; overrides the config file.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search cities interactively (default).
    Interactive,

    /// Show the current weather for a city.
    Show {
        /// City name, e.g. "Lagos" or "New York".
        city: String,
    },

    /// Show the weather for the last city that was found.
    Last,

    /// Enter and store the API key.
    Configure,

    /// Forget the last searched city.
    Clear,

    /// Show where settings live and which API key source is in use;
    /// with options, store new defaults.
    Config {
        /// Provider root URL to store; an empty value restores the default host.
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds to store.
        #[arg(long)]
        default_timeout: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let file_config = Config::load()?;
        let mut config = file_config.clone();
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }

        let file_store = FileStore::open_default().context("Failed to open local storage")?;
        let storage_path = file_store.path().to_path_buf();
        tracing::debug!(path = %storage_path.display(), "opened local storage");
        let store: Arc<dyn KeyValueStore> = Arc::new(file_store);
        let sources = CredentialSources::from_process(self.api_key.as_deref(), store.as_ref());
        let settings = Settings::from_parts(&config, &sources);
        let provider = Arc::new(WeatherApiProvider::with_base_url(settings.base_url.clone()));

        let mut controller = SearchController::new(settings, provider, Arc::clone(&store));

        match self.command.unwrap_or(Command::Interactive) {
            Command::Interactive => interactive::run(&mut controller).await?,
            Command::Show { city } => {
                controller.set_query(city);
                controller.submit();
                controller.settle().await;
                println!("{}", render::render_state(controller.state()));
            }
            Command::Last => {
                controller.restore();
                controller.settle().await;
                if controller.state().committed_city.is_empty() {
                    println!("No previous city. Try `weather show <city>`.");
                } else {
                    println!("{}", render::render_state(controller.state()));
                }
            }
            Command::Configure => {
                let key = inquire::Password::new("WeatherAPI.com API key:")
                    .without_confirmation()
                    .with_help_message("Stored locally and used when no other key is set")
                    .prompt()
                    .context("Failed to read API key")?;

                if controller.save_credential(&key) {
                    println!("API key saved.");
                } else {
                    println!("Empty key, nothing saved.");
                }
            }
            Command::Clear => {
                controller.clear();
                println!("Last city forgotten.");
            }
            Command::Config { base_url, default_timeout } => {
                let mut stored = file_config;
                if stored.update(base_url, default_timeout) {
                    stored.save()?;
                    println!("Configuration saved.");
                }

                let key_source = Settings::credential_source(&sources)
                    .map_or_else(|| "none".to_string(), |source| source.to_string());

                println!("Config file   {}", Config::config_file_path()?.display());
                println!("Storage file  {}", storage_path.display());
                println!("Provider      {}", stored.base_url());
                println!("Timeout       {}s", stored.timeout().as_secs());
                println!("API key from  {key_source}");
            }
        }

        Ok(())
    }
}
