use std::process::ExitCode;
use std::sync::Arc;

use identity_gate::{
    accounts::{AccountStore, HttpRecordStore, InMemoryAccountStore, TieredAccountStore},
    auth::{AuthService, TokenService},
    config::Config,
    create_router,
    notify::{ConsoleNotifier, Notifier, SmtpNotifier},
    AppState,
};
use tracing_subscriber::EnvFilter;

fn account_store(config: &Config) -> Arc<dyn AccountStore> {
    match &config.record_store {
        Some(settings) => match HttpRecordStore::new(settings.clone()) {
            Ok(remote) => {
                tracing::info!(
                    "Using remote record store table '{}' with local mirror",
                    settings.table
                );
                Arc::new(TieredAccountStore::new(Arc::new(remote), settings.timeout))
            }
            Err(e) => {
                tracing::warn!("Remote record store unavailable ({}), using in-memory store", e);
                Arc::new(InMemoryAccountStore::new())
            }
        },
        None => {
            tracing::info!("No record store configured, using in-memory store");
            Arc::new(InMemoryAccountStore::new())
        }
    }
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.mail {
        Some(settings) => match SmtpNotifier::new(settings.clone()) {
            Ok(mail) => {
                tracing::info!(
                    "Sending mail through SMTP server {}:{} ({:?})",
                    settings.host,
                    settings.port,
                    settings.security
                );
                Arc::new(mail)
            }
            Err(e) => {
                tracing::warn!("Mail settings unusable ({}), logging notifications instead", e);
                Arc::new(ConsoleNotifier)
            }
        },
        None => {
            tracing::info!("No mail server configured, logging notifications to console");
            Arc::new(ConsoleNotifier)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("identity_gate=debug,tower_http=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Identity Gate - Starting...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let tokens = TokenService::new(config.jwt_secret.clone(), config.token_ttl());
    let service = AuthService::new(
        account_store(&config),
        tokens,
        notifier(&config),
        config.app_base_url.clone(),
    );

    if let Some(seed) = &config.seed_admin {
        if let Err(e) = service.seed_super_admin(&seed.email, &seed.password).await {
            tracing::error!("Failed to seed SuperAdmin account: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let app = create_router(AppState::new(service));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Identity Gate is running on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
