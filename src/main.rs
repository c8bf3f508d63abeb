//! Main entry point for the storefront admin backend.
//!
//! Sets up the Actix Web server, wraps every page in the route gate, and initializes
//! shared application state (database pool, Supabase settings).
//! Uses dotenv for config and launches the async runtime with structured tracing.

use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use storefront_admin::{
    AppState, RouteGate, get_subscriber, handlers, init_subscriber,
};
use tracing_actix_web::TracingLogger;

/// Main entry point. Configures and runs the Actix Web server.
///
/// - Loads environment variables from `.env`.
/// - Initializes tracing (Bunyan JSON to stdout).
/// - Builds the session and role stores the gate depends on.
/// - Registers the health probe outside the gate and every page route inside it.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber("storefront_admin".to_string(), "info".to_string(), std::io::stdout);
    init_subscriber(subscriber)?;

    let app_state = AppState::new()?;
    let sessions = app_state.session_store();
    let roles = app_state.role_store();
    let gate_config = app_state.gate;
    let bind_address = app_state.bind_address;

    tracing::info!(
        bind_address = %bind_address,
        public_routes = ?gate_config.public_routes,
        "Starting storefront admin server"
    );

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Logger::default())
            .route("/api/health", web::get().to(handlers::health::health_check))
            .service(
                web::scope("")
                    .wrap(RouteGate::new(sessions.clone(), roles.clone(), gate_config.clone()))
                    .configure(handlers::pages::configure_page_routes),
            )
    })
    .bind(&bind_address)?
    .run();

    let srv_handle = server.handle();

    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Shutdown signal received");
            srv_handle.stop(true).await;
        }
        res = server_task => {
            match res {
                Ok(Err(e)) => tracing::error!("Server exited with error: {}", e),
                Err(e) => tracing::error!("Server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
