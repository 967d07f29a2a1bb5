use std::path::PathBuf;

use anyhow::{Context, Result};
use cf_session::{
    AuthToken, Client, ClientConfig, Credentials, EntityKind, Guid, QueryOptions, UserOptions,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "cf-session")]
#[command(about = "Session client for a Cloud Foundry v2 control plane")]
struct Cli {
    /// Control-plane API endpoint, e.g. https://api.example.com
    #[arg(long, env = "CF_TARGET")]
    target: Url,
    /// Access token to use instead of logging in
    #[arg(long, env = "CF_TOKEN")]
    token: Option<String>,
    /// Configuration file (defaults to CF_SESSION_CONFIG or ./cf-session.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log request and response bodies
    #[arg(long, default_value_t = false)]
    trace: bool,
    /// Append one JSON line per request to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Guid of the organization to scope queries to
    #[arg(long, env = "CF_ORGANIZATION")]
    organization: Option<String>,
    /// Guid of the space to scope queries to
    #[arg(long, env = "CF_SPACE")]
    space: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show target metadata
    Info,
    /// Show the prompts the identity service expects at login
    Prompts,
    /// Log in and print the resulting token
    Login {
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "CF_PASSWORD")]
        password: Option<String>,
        /// One-time passcode instead of username/password
        #[arg(long)]
        passcode: Option<String>,
    },
    /// Show the user the current token identifies
    Whoami,
    /// List entities of a kind, scoped to the current organization/space
    List {
        /// Entity kind, e.g. apps, spaces, routes
        kind: EntityKind,
        /// Filter as field:value, e.g. name:my-app
        #[arg(long)]
        filter: Option<String>,
    },
    /// List service instances, including user-provided ones
    ServiceInstances,
    /// Create an identity and the matching control-plane user
    Register {
        email: String,
        #[arg(long, env = "CF_NEW_PASSWORD")]
        password: String,
        #[arg(long)]
        given_name: Option<String>,
        #[arg(long)]
        family_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.trace { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("cf_session={}", level).parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::load()?,
    };
    config.trace |= cli.trace;
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }

    let token = cli.token.as_deref().map(AuthToken::from_bearer);
    let mut client = Client::new(cli.target.clone(), token, config)?;

    if let Some(guid) = &cli.organization {
        let org = client
            .organization(&Guid::new(guid.as_str()))
            .await
            .with_context(|| format!("organization {} not found", guid))?;
        info!("Targeting organization {}", org.name);
        client.set_current_organization(Some(org));
    }
    if let Some(guid) = &cli.space {
        let space = client
            .space(&Guid::new(guid.as_str()))
            .await
            .with_context(|| format!("space {} not found", guid))?;
        info!("Targeting space {}", space.name);
        client.set_current_space(Some(space));
    }

    match cli.command {
        Commands::Info => {
            let info = client.info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Prompts => {
            for (name, prompt) in client.login_prompts().await? {
                println!("{:<12} {}", name, prompt);
            }
        }
        Commands::Login {
            username,
            password,
            passcode,
        } => {
            let credentials = match (passcode, username, password) {
                (Some(code), _, _) => Credentials::passcode(code),
                (None, Some(user), Some(pass)) => Credentials::password(user, pass),
                _ => anyhow::bail!("either --passcode or --username and --password are required"),
            };

            client.login(&credentials).await?;

            let token = client
                .token()
                .context("login succeeded but no token was installed")?;
            println!("{}", token.auth_header());
        }
        Commands::Whoami => match client.current_user().await? {
            Some(user) => {
                println!("  Guid:  {}", user.guid);
                println!("  Email: {}", user.email().unwrap_or("-"));
                println!("  Admin: {}", user.admin);
            }
            None if client.logged_in() => println!("Token carries no user identity."),
            None => println!("Not logged in."),
        },
        Commands::List { kind, filter } => {
            let mut options = QueryOptions::new();
            if let Some(filter) = filter {
                let (field, value) = filter
                    .split_once(':')
                    .context("--filter must be field:value")?;
                options = options.filter(field, value);
            }

            info!("Listing {} from {:?}", kind, client.query_target(kind));
            let resources = client.list(kind, options).await?;

            println!("{:<38} {}", "GUID", "NAME");
            println!("{}", "-".repeat(60));
            for resource in &resources {
                let guid = resource
                    .pointer("/metadata/guid")
                    .and_then(|g| g.as_str())
                    .unwrap_or("-");
                let name = resource
                    .pointer("/entity/name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("-");
                println!("{:<38} {}", guid, name);
            }
            println!();
            println!("{} {}", resources.len(), kind);
        }
        Commands::ServiceInstances => {
            let instances = client.service_instances(QueryOptions::new()).await?;

            println!("{:<38} {:<30} {}", "GUID", "NAME", "TYPE");
            println!("{}", "-".repeat(100));
            for instance in instances {
                println!(
                    "{:<38} {:<30} {}",
                    instance.guid().as_str(),
                    instance.name().unwrap_or("-"),
                    instance.variant_name()
                );
            }
        }
        Commands::Register {
            email,
            password,
            given_name,
            family_name,
        } => {
            let options = UserOptions {
                given_name,
                family_name,
            };
            let user = client.register(&email, &password, &options).await?;
            println!("Registered {} with guid {}", email, user.guid);
        }
    }

    Ok(())
}
