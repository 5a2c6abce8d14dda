use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use mirrorhook::config::{Config, resolve_paths};
use mirrorhook::db::Database;
use mirrorhook::model::Namespace;

#[derive(Parser)]
#[command(name = "provision")]
#[command(about = "Registers users and their upstream access tokens")]
struct Cli {
    #[arg(short = 'c', long = "config")]
    config_path: Option<String>,
    /// Operate on the test user namespace.
    #[arg(long)]
    test: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a user with the secret its notifications will carry.
    AddUser { user_id: String, verify_token: String },
    /// Store the access token used to fetch the user's items.
    SetToken {
        user_id: String,
        access_token: String,
        #[arg(long)]
        expires_in_secs: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config_path, data_dir) = resolve_paths(cli.config_path.as_deref());

    let cfg = Config::new(&config_path.to_string_lossy())
        .with_context(|| format!("failed to load config: {}", config_path.display()))?;
    let db = Database::new(&cfg, &data_dir).await?;
    let namespace = if cli.test {
        Namespace::Test
    } else {
        Namespace::Production
    };

    match cli.command {
        Command::AddUser { user_id, verify_token } => {
            db.create_user(namespace, &user_id, &verify_token).await?;
            println!("registered {} in {} namespace", user_id, namespace.as_str());
        }
        Command::SetToken {
            user_id,
            access_token,
            expires_in_secs,
        } => {
            let expires_at = expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs));
            db.store_credentials(namespace, &user_id, &access_token, expires_at)
                .await?;
            println!("stored access token for {}", user_id);
        }
    }

    Ok(())
}
