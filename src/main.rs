use anyhow::Result;
use clap::{Parser, Subcommand};

use instareply_core::config::{self, Config};
use instareply_core::profile::{NewProfile, Profile, ProfileContext, ProfileStore, ProfileUpdate, Tone};
use instareply_core::relay::{ChatRelay, ChatRequest, ProfileSnapshot, SubscribeRelay, SubscribeRequest};
use instareply_core::storage::FileKeyValueStore;

#[derive(Parser)]
#[command(
    name = "instareply",
    about = "Instarep.ly waitlist and reply-profile service",
    version = instareply_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    #[cfg(feature = "http-api")]
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Manage reply profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Send a message through the chat relay using the current profile
    Chat {
        /// Message to send
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Add an email address to the waitlist
    Subscribe {
        /// Email address
        email: String,
    },
    /// Write a default config file
    Onboard,
    /// Show configuration status
    Status,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List all profiles
    List,
    /// Show a profile as JSON (current profile by default)
    Show {
        /// Profile ID
        id: Option<String>,
    },
    /// Create a profile
    Create {
        /// Display name
        name: String,
        /// Disable emojis in replies
        #[arg(long)]
        no_emojis: bool,
        /// professional, friendly, casual or formal
        #[arg(short, long)]
        tone: Option<Tone>,
        /// Language code
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Make a profile current
    Use {
        /// Profile ID
        id: String,
    },
    /// Update fields of a profile
    Update {
        /// Profile ID
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        tone: Option<Tone>,
        /// true or false
        #[arg(short, long)]
        emojis: Option<bool>,
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Delete a profile
    Delete {
        /// Profile ID
        id: String,
    },
    /// Remove all stored profiles; the next run starts from the default
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("instareply=info".parse()?)
                .add_directive("instareply_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config_from_env();

    match cli.command {
        #[cfg(feature = "http-api")]
        Commands::Serve { host, port } => cmd_serve(config, host, port).await?,
        Commands::Profile { command } => cmd_profile(&config, command)?,
        Commands::Chat { message } => cmd_chat(&config, message.join(" ")).await?,
        Commands::Subscribe { email } => cmd_subscribe(&config, email).await?,
        Commands::Onboard => cmd_onboard()?,
        Commands::Status => cmd_status(&config),
    }

    Ok(())
}

// ====== Commands ======

fn open_store(config: &Config) -> instareply_core::Result<ProfileStore> {
    let backend = FileKeyValueStore::new(&config.storage_dir())?;
    Ok(ProfileStore::new(Box::new(backend)))
}

/// Open this machine's profile session.
fn open_profiles(config: &Config) -> instareply_core::Result<ProfileContext> {
    let mut profiles = ProfileContext::new(open_store(config)?);
    profiles.init();
    Ok(profiles)
}

#[cfg(feature = "http-api")]
async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    use std::sync::Arc;
    use instareply_core::service::http::{self, AppState};

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.bind_addr();

    let profiles = open_profiles(&config)?;
    let state = Arc::new(AppState::from_config(config, profiles));
    if state.chat.is_demo() {
        tracing::warn!("OPENAI_API_KEY not set, chat runs in demo mode");
    }

    http::serve(&addr, state.clone()).await?;

    match Arc::try_unwrap(state) {
        Ok(state) => state.profiles.into_inner().teardown(),
        Err(_) => tracing::warn!("Server state still shared at shutdown, skipping final profile write"),
    }
    Ok(())
}

fn cmd_profile(config: &Config, command: ProfileCommands) -> Result<()> {
    let mut profiles = open_profiles(config)?;

    match command {
        ProfileCommands::List => {
            let current_id = profiles.current_profile().map(|p| p.id.clone());
            for p in profiles.profiles() {
                let marker = if current_id.as_deref() == Some(p.id.as_str()) { "*" } else { " " };
                println!("{} {}", marker, describe(p));
            }
        }
        ProfileCommands::Show { id } => {
            let profile = match &id {
                Some(id) => profiles.find(id),
                None => profiles.current_profile(),
            };
            match profile {
                Some(p) => println!("{}", serde_json::to_string_pretty(p)?),
                None => anyhow::bail!("Profile not found: {}", id.unwrap_or_default()),
            }
        }
        ProfileCommands::Create {
            name,
            no_emojis,
            tone,
            language,
        } => {
            let created = profiles.create_profile(NewProfile {
                name,
                include_emojis: !no_emojis,
                tone,
                language,
            });
            println!("Created {}", describe(&created));
        }
        ProfileCommands::Use { id } => {
            let Some(profile) = profiles.find(&id).cloned() else {
                anyhow::bail!("Profile not found: {}", id);
            };
            profiles.set_current_profile(profile);
            if let Some(current) = profiles.current_profile() {
                println!("Current profile: {}", describe(current));
            }
        }
        ProfileCommands::Update {
            id,
            name,
            tone,
            emojis,
            language,
        } => {
            let update = ProfileUpdate {
                name,
                include_emojis: emojis,
                tone,
                language,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            if profiles.find(&id).is_none() {
                anyhow::bail!("Profile not found: {}", id);
            }
            profiles.update_profile(&id, &update);
            if let Some(p) = profiles.find(&id) {
                println!("Updated {}", describe(p));
            }
        }
        ProfileCommands::Delete { id } => {
            let is_current = profiles.current_profile().is_some_and(|p| p.id == id);
            if profiles.find(&id).is_none() && !is_current {
                anyhow::bail!("Profile not found: {}", id);
            }
            profiles.delete_profile(&id);
            println!("Deleted {}", id);
            if let Some(current) = profiles.current_profile() {
                println!("Current profile: {}", describe(current));
            }
        }
        ProfileCommands::Reset => {
            // Drop the session without its final write so nothing is left behind.
            drop(profiles);
            open_store(config)?.clear()?;
            println!("Removed stored profiles from {}", config.storage_dir().display());
            return Ok(());
        }
    }

    profiles.teardown();
    Ok(())
}

fn describe(p: &Profile) -> String {
    format!(
        "{} ({}) tone={} emojis={}",
        p.name,
        p.id,
        p.effective_tone(),
        if p.include_emojis { "on" } else { "off" }
    )
}

async fn cmd_chat(config: &Config, message: String) -> Result<()> {
    let profiles = open_profiles(config)?;
    let snapshot = profiles.current_profile().map(ProfileSnapshot::from);

    let relay = ChatRelay::from_config(config);
    match relay.handle(ChatRequest::new(message, snapshot)).await {
        Ok(resp) => {
            println!("{}", resp.response);
            if resp.is_demo {
                eprintln!("\n(demo response: set OPENAI_API_KEY for live replies)");
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("Chat failed ({}): {}", e.status_code(), e),
    }
}

async fn cmd_subscribe(config: &Config, email: String) -> Result<()> {
    let relay = SubscribeRelay::from_config(config);
    match relay.handle(SubscribeRequest::new(email)).await {
        Ok(resp) => {
            println!("{}", resp.message);
            Ok(())
        }
        Err(e) => anyhow::bail!("Subscribe failed ({}): {}", e.status_code(), e),
    }
}

fn cmd_onboard() -> Result<()> {
    let config_path = config::get_config_path();

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        println!("Delete it first to re-onboard.");
        return Ok(());
    }

    let cfg = Config::default();
    config::save_config(&cfg, None)?;
    println!("Created config at {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Add your OpenAI and Kit API keys to {}", config_path.display());
    println!("     (or export OPENAI_API_KEY / KIT_API_KEY)");
    println!("  2. Start the server: instareply serve");
    Ok(())
}

fn cmd_status(config: &Config) {
    let config_path = config::get_config_path();
    let set = |v: Option<&str>| if v.is_some() { "✓" } else { "not set" };

    println!("instareply {} ({})\n", instareply_core::VERSION, instareply_core::GIT_HASH);
    println!(
        "Config: {} {}",
        config_path.display(),
        if config_path.exists() { "✓" } else { "✗" }
    );
    println!("Storage: {}", config.storage_dir().display());
    println!("Listen: {}", config.bind_addr());
    println!("Model: {}", config.chat.model);
    println!("OpenAI API: {}", set(config.openai_api_key()));
    println!("Kit API: {}", set(config.kit_api_key()));
    println!("Waitlist tag: {}", config.providers.kit.tag_name);
}
