use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use stagecast_api::{create_router, AppState};
use stagecast_core::repository::{
    DestinationRepository, ParticipantRepository, RecordingRepository, RoomRepository,
    SceneRepository, UserRepository,
};
use stagecast_core::service::{
    CredentialEncryption, DestinationService, EgressClient, MediaTokenService, ParticipantService,
    RecordingService, RoomService, SessionTokenService, UserService,
};
use stagecast_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config file path as the first argument; env vars win over it
    let config_file = std::env::args().nth(1);
    let config = Config::load(config_file.as_deref())?;

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    stagecast_core::logging::init_logging(&config.logging)?;
    info!("Stagecast server starting...");
    info!("HTTP address: {}", config.http_address());

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_seconds))
        .connect(config.database_url())
        .await?;
    info!("Database connection established");

    info!("Running database migrations...");
    sqlx::migrate!("../migrations").run(&pool).await.map_err(|e| {
        error!("Failed to run migrations: {}", e);
        anyhow::anyhow!("Migration failed: {e}")
    })?;
    info!("Migrations completed");

    let users = UserRepository::new(pool.clone());
    let rooms = RoomRepository::new(pool.clone());
    let participants = ParticipantRepository::new(pool.clone());
    let destinations = DestinationRepository::new(pool.clone());
    let recordings = RecordingRepository::new(pool.clone());
    let scenes = SceneRepository::new(pool.clone());

    let sessions = SessionTokenService::new(
        &config.auth.jwt_secret,
        config.auth.token_duration_hours,
    )?;
    let media_tokens = MediaTokenService::new(&config.media)?;
    let encryption = CredentialEncryption::from_hex_key(&config.encryption.credential_key)?;
    let egress_client = EgressClient::new(&config.media, config.storage.clone())?;

    let state = AppState {
        pool: pool.clone(),
        user_service: Arc::new(UserService::new(users, sessions)),
        room_service: Arc::new(RoomService::new(pool.clone(), rooms, scenes)),
        participant_service: Arc::new(ParticipantService::new(participants, media_tokens)),
        destination_service: Arc::new(DestinationService::new(destinations, encryption)),
        recording_service: Arc::new(RecordingService::new(recordings)),
        egress_client: Arc::new(egress_client),
    };

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.http_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM so in-flight requests can drain
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
