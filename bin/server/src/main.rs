mod cli;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use liap_rooms::Lobby;

#[cfg(feature = "database")]
type Repository = liap_persist::PostgresRepository;
#[cfg(not(feature = "database"))]
type Repository = liap_persist::NoopRepository;

#[actix_web::main]
async fn main() {
    let args = cli::Args::parse();
    liap_core::init_logging(&args.log_level);

    let listen_host = args.listen_host.clone();
    let listen_port = args.listen_port;
    let heartbeat_interval = Duration::from_millis(args.heartbeat_interval_ms);
    let missed_threshold = (args.heartbeat_timeout_ms / args.heartbeat_interval_ms.max(1)).max(1) as u32;
    let reconnect_secret = args.reconnect_secret();
    let config = args.into_config();

    let lobby = match build_lobby(config, reconnect_secret).await {
        Ok(lobby) => Arc::new(lobby),
        Err(message) => {
            log::error!("configuration error: {message}");
            std::process::exit(1);
        }
    };

    spawn_heartbeat_sweep(lobby.clone(), heartbeat_interval, missed_threshold);
    spawn_phase_timeout_sweep(lobby.clone());

    let lobby_data = web::Data::from(lobby);
    log::info!("listening on {listen_host}:{listen_port}");
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .wrap(Cors::default().allow_any_origin().allow_any_method().allow_any_header())
            .app_data(lobby_data.clone())
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/rooms")
                    .route("", web::get().to(handlers::room_list::<Repository>))
                    .route("", web::post().to(handlers::create_room::<Repository>))
                    .route("/{code}/join", web::post().to(handlers::join_room::<Repository>))
                    .route("/{code}/leave", web::post().to(handlers::leave_room::<Repository>))
                    .route("/{code}/start", web::post().to(handlers::start_game::<Repository>))
                    .route("/{code}/bots/add", web::post().to(handlers::add_bot::<Repository>))
                    .route("/{code}/bots/remove", web::post().to(handlers::remove_bot::<Repository>))
                    .route("/{code}/connect", web::get().to(handlers::connect::<Repository>)),
            )
            .route("/reconnect", web::get().to(handlers::reconnect::<Repository>))
    })
    .bind((listen_host.as_str(), listen_port));

    let server = match server {
        Ok(server) => server,
        Err(e) => {
            log::error!("failed to bind {listen_host}:{listen_port}: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = server.run().await {
        log::error!("server error: {e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "database")]
async fn build_lobby(
    config: liap_core::Config,
    reconnect_secret: Option<Vec<u8>>,
) -> Result<Lobby<Repository>, String> {
    let url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set when built with `database`".to_string())?;
    let (client, connection) = tokio_postgres::connect(&url, tokio_postgres::tls::NoTls)
        .await
        .map_err(|e| format!("database connection failed: {e}"))?;
    tokio::spawn(connection);
    let repository = liap_persist::PostgresRepository::new(Arc::new(client));
    repository.migrate().await.map_err(|e| format!("schema migration failed: {e}"))?;
    Ok(make_lobby(config, Arc::new(repository), reconnect_secret))
}

#[cfg(not(feature = "database"))]
async fn build_lobby(
    config: liap_core::Config,
    reconnect_secret: Option<Vec<u8>>,
) -> Result<Lobby<Repository>, String> {
    Ok(make_lobby(config, Arc::new(liap_persist::NoopRepository), reconnect_secret))
}

fn make_lobby(config: liap_core::Config, repository: Arc<Repository>, reconnect_secret: Option<Vec<u8>>) -> Lobby<Repository> {
    match reconnect_secret {
        Some(secret) => Lobby::with_secret(config, repository, &secret),
        None => Lobby::with_persistence(config, repository),
    }
}

/// Periodically sweeps the connection registry for heartbeat timeouts and
/// hands each stale seat to its room's bot driver.
fn spawn_heartbeat_sweep(lobby: Arc<Lobby<Repository>>, interval: Duration, missed_threshold: u32) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let stale = lobby.connections.sweep_stale(missed_threshold, interval).await;
            for seat in stale {
                lobby.handle_stale_seat(seat.room, seat.position).await;
            }
        }
    });
}

/// Periodically checks every in-progress room's phase-decision deadline,
/// submitting the phase's default action once it lapses. Polled well below
/// the shortest configurable decision timeout so a deadline never slips by
/// more than one tick.
fn spawn_phase_timeout_sweep(lobby: Arc<Lobby<Repository>>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            lobby.sweep_phase_timeouts().await;
        }
    });
}
