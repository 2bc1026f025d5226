/// Jukebox Server - collaborative playback queue
use anyhow::Context;
use clap::{Parser, Subcommand};
use jukebox_core::{JukeboxError, QueueStore, UpsertUser};
use jukebox_metadata::OEmbedResolver;
use jukebox_server::{
    config::ServerConfig,
    create_router,
    services::{AuthService, QueueService},
    state::AppState,
};
use jukebox_storage::LocalStorageContext;
use sqlx::SqlitePool;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jukebox-server")]
#[command(about = "Collaborative playback queue server", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create a user, or update an existing user's name and password
    AddUser {
        /// Email address (login name)
        #[arg(short, long)]
        email: String,
        /// Display name shown next to submissions
        #[arg(short, long)]
        name: String,
        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// List all users
    ListUsers,
    /// Recompute every active item's tally from the vote ledger and report drift
    VerifyTallies,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_server=info,jukebox_storage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::AddUser {
            email,
            name,
            password,
        } => add_user(&config, &email, &name, &password).await?,
        Commands::ListUsers => list_users(&config).await?,
        Commands::VerifyTallies => verify_tallies(&config).await?,
    }

    Ok(())
}

async fn open_database(config: &ServerConfig) -> anyhow::Result<SqlitePool> {
    let pool = jukebox_storage::create_pool(
        &config.storage.database_url,
        &config.storage.pool_settings(),
    )
    .await
    .with_context(|| format!("Failed to open {}", config.storage.database_url))?;
    jukebox_storage::run_migrations(&pool).await?;
    Ok(pool)
}

fn auth_service(config: &ServerConfig) -> AuthService {
    AuthService::new(
        config.auth.jwt_secret.clone(),
        config.auth.jwt_expiration_hours,
        config.auth.jwt_refresh_expiration_days,
    )
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Starting Jukebox Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    // Initialize database
    let db = Arc::new(LocalStorageContext::new(open_database(&config).await?));
    tracing::info!("Database connected");

    // Initialize auth service
    let auth_service = Arc::new(auth_service(&config));
    tracing::info!("Auth service initialized");

    // Initialize metadata resolver
    let resolver = Arc::new(OEmbedResolver::new(config.metadata.oembed_config())?);
    tracing::info!(endpoint = %resolver.endpoint(), "Metadata resolver initialized");

    let queue_service = Arc::new(QueueService::new(db.clone(), resolver));

    // Build application state
    let app_state = AppState::new(
        db,
        auth_service,
        queue_service,
        config.polling.interval_ms,
    );

    // Build router
    let app = create_router(app_state);

    // Create server address
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn add_user(
    config: &ServerConfig,
    email: &str,
    name: &str,
    password: &str,
) -> anyhow::Result<()> {
    let pool = open_database(config).await?;
    let auth_service = auth_service(config);

    let user = jukebox_storage::users::upsert(&pool, &UpsertUser::new(email, name)).await?;
    let password_hash = auth_service.hash_password(password)?;
    jukebox_storage::users::set_password_hash(&pool, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, email = %user.email, "User saved");
    println!("{} - {} <{}>", user.id, user.display_name, user.email);

    Ok(())
}

async fn list_users(config: &ServerConfig) -> anyhow::Result<()> {
    let db = LocalStorageContext::new(open_database(config).await?);
    let users = db.get_all_users().await?;

    println!("Users:");
    for user in users {
        println!("  {} - {} <{}>", user.id, user.display_name, user.email);
    }

    Ok(())
}

async fn verify_tallies(config: &ServerConfig) -> anyhow::Result<()> {
    let pool = open_database(config).await?;
    let mut drifted = 0;

    let ids = jukebox_storage::queue::active_ids(&pool).await?;
    for id in &ids {
        let repair = match jukebox_storage::votes::repair(&pool, *id).await {
            Ok(repair) => repair,
            // Gone between listing and repair
            Err(JukeboxError::QueueItemNotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        if repair.drifted() {
            drifted += 1;
            println!(
                "  {} - stored +{}/-{}, ledger +{}/-{} (repaired)",
                id,
                repair.stored.upvotes,
                repair.stored.downvotes,
                repair.ledger.upvotes,
                repair.ledger.downvotes
            );
        }
    }

    println!("Checked {} items, {} drifted", ids.len(), drifted);

    Ok(())
}
