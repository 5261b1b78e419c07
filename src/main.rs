use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use tchat_server::configuration::{get_configuration, get_environment};
use tchat_server::startup::{build_auth_service, run, Stores};
use tchat_server::store::PgStore;
use tchat_server::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, msg: &str) -> std::io::Error {
    std::io::Error::new(kind, msg.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let environment = get_environment().map_err(|e| {
        tracing::error!("Failed to read APP_ENVIRONMENT: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(environment = environment.as_str(), "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Refuse to start without a usable signing secret.
    let secret = configuration.jwt.signing_secret(environment).map_err(|e| {
        tracing::error!("Refusing to start: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to migrate the database: {}", e);
            startup_error(std::io::ErrorKind::Other, "Database migration error")
        })?;

    tracing::info!("Database ready (users, messages, refresh_tokens)");

    let stores = Stores::from_backend(PgStore::new(pool));
    let auth_service = build_auth_service(&stores, &secret, &configuration.jwt);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, stores, auth_service)?;
    server.await
}
