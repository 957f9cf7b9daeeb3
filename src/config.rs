use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use std::io::Write;
use std::path::PathBuf;

/// Default OAuth2 client identifier registered for the mobile storefront
pub const DEFAULT_CLIENT_ID: &str = "mobileapp";

/// Storefront Client - customer, loyalty and order access from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the storefront API
    #[arg(short = 'u', long, env = "STOREFRONT_API_URL")]
    pub api_url: Option<String>,

    /// API key sent as X-API-Key on every request
    #[arg(short = 'k', long, env = "STOREFRONT_API_KEY")]
    pub api_key: Option<String>,

    /// OAuth2 client id used for token exchange
    #[arg(long, env = "STOREFRONT_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Optional OAuth2 scope
    #[arg(long, env = "STOREFRONT_SCOPE")]
    pub scope: Option<String>,

    /// Path to the SQLite session store
    #[arg(short = 's', long, env = "STOREFRONT_STORE_FILE")]
    pub store_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds (transport default when unset)
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// HTTP request timeout in seconds (transport default when unset)
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT")]
    pub request_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Use the legacy /login endpoint instead of the OAuth2 password grant
        #[arg(long)]
        legacy: bool,
    },
    /// Show loyalty profile details
    Profile,
    /// Show the basic customer record
    Customer,
    /// List order history
    Orders,
    /// Show whether a session is stored
    Status,
    /// Forget the stored session
    Logout,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub api_url: String,
    pub api_key: String,

    // OAuth2
    pub client_id: String,
    pub scope: Option<String>,

    // Persistence
    pub store_file: PathBuf,

    // HTTP client
    pub http_connect_timeout: Option<u64>,
    pub http_request_timeout: Option<u64>,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Configuration with defaults for everything but the backend
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: None,
            store_file: default_store_file(),
            http_connect_timeout: None,
            http_request_timeout: None,
            log_level: "info".to_string(),
        }
    }

    /// Load configuration from all sources with priority: CLI > ENV > .env > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone();
        Ok((Self::from_args(args)?, command))
    }

    /// Build config from parsed CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            api_url: args
                .api_url
                .context("STOREFRONT_API_URL is required (use -u or set STOREFRONT_API_URL env var)")?,

            api_key: args
                .api_key
                .context("STOREFRONT_API_KEY is required (use -k or set STOREFRONT_API_KEY env var)")?,

            client_id: args.client_id,

            scope: args.scope.filter(|s| !s.is_empty()),

            store_file: args
                .store_file
                .map(|s| expand_tilde(&s))
                .unwrap_or_else(default_store_file),

            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.request_timeout,

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let lower = self.api_url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            anyhow::bail!(
                "STOREFRONT_API_URL must be an absolute http(s) URL: {}",
                self.api_url
            );
        }

        if self.api_key.trim().is_empty() {
            anyhow::bail!("STOREFRONT_API_KEY cannot be empty");
        }

        if self.client_id.trim().is_empty() {
            anyhow::bail!("STOREFRONT_CLIENT_ID cannot be empty");
        }

        Ok(())
    }
}

/// Default location of the session database
pub fn default_store_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront-client")
        .join("session.sqlite3")
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}


// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and missing required values)
pub fn needs_interactive_setup() -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();

    let has_api_url = std::env::var("STOREFRONT_API_URL").is_ok();
    let has_api_key = std::env::var("STOREFRONT_API_KEY").is_ok();

    !env_file_exists && (!has_api_url || !has_api_key)
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub api_url: String,
    pub api_key: String,
}

/// Run interactive setup to collect the backend URL and API key
pub fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("Storefront Client - First Time Setup");
    println!();
    println!("No configuration found. Let's point the client at your backend.");
    println!();

    let api_url: String = Input::new()
        .with_prompt("Storefront API base URL (STOREFRONT_API_URL)")
        .interact_text()
        .context("Failed to read STOREFRONT_API_URL")?;

    let api_key: String = Password::new()
        .with_prompt("Storefront API key (STOREFRONT_API_KEY)")
        .interact()
        .context("Failed to read STOREFRONT_API_KEY")?;

    if api_key.is_empty() {
        anyhow::bail!("STOREFRONT_API_KEY cannot be empty");
    }

    let config = InteractiveConfig { api_url, api_key };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!("Configuration saved to .env file");
    }

    println!();
    Ok(config)
}

/// Contents of the `.env` file written by interactive setup
fn env_file_contents(config: &InteractiveConfig) -> String {
    format!(
        r#"# Storefront Client Configuration
# Generated by interactive setup

# Backend base URL (required)
STOREFRONT_API_URL={}

# API key sent as X-API-Key (required)
STOREFRONT_API_KEY={}

# OAuth2 client id
STOREFRONT_CLIENT_ID={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.api_url, config.api_key, DEFAULT_CLIENT_ID,
    )
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let env_content = env_file_contents(config);

    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_content.as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
