use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use railgen::auth::PasswordHasher;
use railgen::config::{ServerConfig, rate_limit_deactivated};
use railgen::license::{TemplateStore, render_all};
use railgen::store::seed::{self, SeedCatalog};
use railgen::store::{SqliteStore, Store};
use railgen::server::{AppState, create_router};
use railgen::types::NewUser;

#[derive(Parser)]
#[command(name = "railgen")]
#[command(about = "A Responsible AI License generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command. Flags override the config file.
#[derive(Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(long, env = "RAILGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the database
    #[arg(long, env = "RAILGEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Directory holding the license templates
    #[arg(long, env = "RAILGEN_TEMPLATE_DIR")]
    template_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn resolve(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(template_dir) = &self.template_dir {
            config.template_dir = template_dir.clone();
        }

        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Host to bind to
        #[arg(long, env = "RAILGEN_HOST")]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short, env = "RAILGEN_PORT")]
        port: Option<u16>,

        /// Git repository tracking the templates
        #[arg(long, env = "RAILGEN_TEMPLATE_REPO")]
        template_repo: Option<PathBuf>,

        /// Path of the template directory inside the repository
        #[arg(long, env = "RAILGEN_TEMPLATE_REPO_PREFIX")]
        template_repo_prefix: Option<String>,

        /// Pandoc executable
        #[arg(long, env = "RAILGEN_PANDOC")]
        pandoc: Option<String>,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "cors-origin", env = "BACKEND_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        /// Disables rate limiting when exactly "true"
        #[arg(long, env = "DEACTIVATE_RATE_LIMIT", hide = true)]
        deactivate_rate_limit: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the database, create the first superuser and import a catalog
    Init {
        #[command(flatten)]
        config: ConfigArgs,

        /// Email of the first superuser
        #[arg(long, env = "FIRST_SUPERUSER")]
        email: Option<String>,

        /// Password of the first superuser
        #[arg(long, env = "FIRST_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Catalog to import (JSON with Source, Domain and Restriction maps)
        #[arg(long)]
        seed: Option<PathBuf>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Render every license family and artifact combination to a directory
    RenderAll {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
}

fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    fs::create_dir_all(&config.data_dir)?;
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    Ok(store)
}

fn run_init(
    config: &ServerConfig,
    email: Option<String>,
    password: Option<String>,
    seed_file: Option<PathBuf>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = open_store(config)?;

    if store.has_superuser()? {
        info!("A superuser already exists, skipping account creation");
    } else {
        let (email, password) = superuser_credentials(email, password, non_interactive)?;
        let hashed_password = PasswordHasher::new().hash(&password)?;

        let user = store.create_user(&NewUser {
            email,
            full_name: "Admin".to_string(),
            hashed_password,
            is_active: true,
            is_superuser: true,
        })?;

        println!();
        println!("========================================");
        println!("Created superuser '{}'", user.email);
        println!("========================================");
        println!();
    }

    if let Some(path) = seed_file {
        let catalog = SeedCatalog::load(&path)?;
        let report = seed::apply(&store, &catalog)?;
        println!(
            "Imported {} sources, {} domains and {} restrictions from {}",
            report.sources,
            report.domains,
            report.restrictions,
            path.display()
        );
    }

    Ok(())
}

fn superuser_credentials(
    email: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<(String, String)> {
    let email = match email {
        Some(email) => email,
        None if non_interactive => {
            bail!("No superuser exists. Pass --email or set FIRST_SUPERUSER.")
        }
        None => inquire::Text::new("Superuser email:")
            .with_validator(|input: &str| {
                if input.contains('@') {
                    Ok(inquire::validator::Validation::Valid)
                } else {
                    Ok(inquire::validator::Validation::Invalid(
                        "Enter an email address".into(),
                    ))
                }
            })
            .prompt()?,
    };

    let password = match password {
        Some(password) => password,
        None if non_interactive => {
            bail!("No superuser exists. Pass --password or set FIRST_SUPERUSER_PASSWORD.")
        }
        None => inquire::Password::new("Superuser password:").prompt()?,
    };

    if password.is_empty() {
        bail!("The superuser password cannot be empty");
    }

    Ok((email, password))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("railgen=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                config,
                email,
                password,
                seed,
                non_interactive,
            } => {
                let config = config.resolve()?;
                run_init(&config, email, password, seed, non_interactive)?;
            }
            AdminCommands::RenderAll { config, out } => {
                let config = config.resolve()?;
                let written = render_all(&TemplateStore::new(&config.template_dir), &out)?;
                println!("Rendered {} licenses into {}", written.len(), out.display());
            }
        },
        Commands::Serve {
            config,
            host,
            port,
            template_repo,
            template_repo_prefix,
            pandoc,
            cors_origins,
            deactivate_rate_limit,
        } => {
            let mut config = config.resolve()?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if template_repo.is_some() {
                config.template_repo = template_repo;
            }
            if let Some(prefix) = template_repo_prefix {
                config.template_repo_prefix = prefix;
            }
            if let Some(pandoc) = pandoc {
                config.pandoc = pandoc;
            }
            if !cors_origins.is_empty() {
                config.cors_origins = cors_origins;
            }
            if rate_limit_deactivated(deactivate_rate_limit.as_deref()) {
                config.rate_limit = false;
            }

            let store = open_store(&config)?;
            if !store.has_superuser()? {
                bail!(
                    "Server not initialized. Run 'railgen admin init' first to create the first superuser."
                );
            }

            let expired = store.delete_expired_tokens()?;
            if expired > 0 {
                info!("Removed {expired} expired tokens");
            }

            if !config.rate_limit {
                info!("Rate limiting is deactivated");
            }

            let state = Arc::new(AppState::from_config(Arc::new(store), &config));
            if state.templates.has_history() {
                info!("Template history enabled");
            }

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
        }
    }

    Ok(())
}
