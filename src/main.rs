use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use std::sync::Arc;

use storefront_client::config::{self, Command, Config};
use storefront_client::models::LoginRequest;
use storefront_client::{AuthState, SessionUser, SqliteStore, StorefrontApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Check if interactive setup is needed (no .env and missing required values)
    if config::needs_interactive_setup() {
        let interactive_config = config::run_interactive_setup()?;

        // Set environment variables from interactive config so Config::load() can use them
        std::env::set_var("STOREFRONT_API_URL", &interactive_config.api_url);
        std::env::set_var("STOREFRONT_API_KEY", &interactive_config.api_key);
    }

    // Load configuration first (for log level)
    let (config, command) = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Backend: {}", config.api_url);
    tracing::debug!("Session store: {}", config.store_file.display());

    let store = Arc::new(
        SqliteStore::open(&config.store_file).context("Failed to open session store")?,
    );
    let api = StorefrontApi::new(&config, store).context("Failed to initialize client")?;

    let state = api.check_auth_status().await;

    match command {
        Command::Login { email, legacy } => login(&api, email, legacy).await?,
        Command::Profile => {
            require_session(&state)?;
            print_profile(&api).await?;
        }
        Command::Customer => {
            require_session(&state)?;
            let customer = api.get_customer().await?;
            println!("{}", serde_json::to_string_pretty(&customer)?);
        }
        Command::Orders => {
            require_session(&state)?;
            print_orders(&api).await?;
        }
        Command::Status => match state {
            AuthState::Authenticated(user) => {
                println!("Signed in as {} <{}> (id {})", user.name, user.email, user.id)
            }
            _ => println!("Not signed in"),
        },
        Command::Logout => {
            api.logout().await?;
            println!("Signed out");
        }
    }

    Ok(())
}

/// Prompt for missing credentials and sign in
async fn login(api: &StorefrontApi, email: Option<String>, legacy: bool) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("Failed to read email")?,
    };

    let password: String = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    let credentials = LoginRequest::new(email, password);

    let user: SessionUser = if legacy {
        api.legacy_login(&credentials).await?.user.into()
    } else {
        api.sign_in(&credentials).await?
    };

    println!("Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

async fn print_profile(api: &StorefrontApi) -> Result<()> {
    let details = api.get_customer_details().await?;

    let name = details.full_name();
    println!("Name:           {}", if name.is_empty() { "-" } else { name.as_str() });
    println!("Email:          {}", details.email.as_deref().unwrap_or("-"));
    println!("Phone:          {}", details.mobile_phone.as_deref().unwrap_or("-"));
    println!("Loyalty number: {}", details.loyalty_number.as_deref().unwrap_or("-"));
    println!("Status:         {}", details.status_name.as_deref().unwrap_or("-"));
    println!("Member since:   {}", details.created_date);
    Ok(())
}

async fn print_orders(api: &StorefrontApi) -> Result<()> {
    let orders = api.get_orders().await?;
    if orders.is_empty() {
        println!("No orders yet");
        return Ok(());
    }

    for order in &orders {
        println!(
            "#{:<10} {:<12} {:>10.2} {:<10} {} item(s)",
            order.id, order.date, order.total, order.status, order.items
        );
    }
    Ok(())
}

fn require_session(state: &AuthState) -> Result<()> {
    if !state.is_authenticated() {
        anyhow::bail!("Not signed in. Run `storefront login` first.");
    }
    Ok(())
}
