//! Application startup and lifecycle management.
//!
//! Serves the greet API plus health/metrics over HTTP and kicks off settings
//! bundle registration in the background once the listener is bound.

use crate::config::HelloConfig;
use crate::handlers;
use crate::services::{BundleRegistrar, Greeter, HttpSettingsClient, SettingsService};
use crate::SERVICE_NAME;
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, version_header,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: HelloConfig,
    pub greeter: Greeter,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    debug_port: Option<u16>,
    debug_listener: Option<TcpListener>,
    state: AppState,
    registrar: BundleRegistrar,
    shutdown: CancellationToken,
}

impl Application {
    /// Build the application against the settings service named in `config`.
    pub async fn build(config: HelloConfig) -> Result<Self, AppError> {
        let client = HttpSettingsClient::new(&config.settings_service).map_err(|e| {
            tracing::error!("Failed to create settings service client: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        Self::build_with_settings(config, Arc::new(client)).await
    }

    /// Build the application with an explicit settings service implementation.
    pub async fn build_with_settings(
        config: HelloConfig,
        settings: Arc<dyn SettingsService>,
    ) -> Result<Self, AppError> {
        let shutdown = CancellationToken::new();

        let greeter = Greeter::new(
            settings.clone(),
            config.registration.identifiers.phrase_setting_id.clone(),
        );
        let registrar =
            BundleRegistrar::new(settings, config.registration.registrar_config())
                .with_shutdown(shutdown.clone());

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let debug_listener = match config.common.debug_port {
            Some(debug_port) => {
                let addr = SocketAddr::from(([0, 0, 0, 0], debug_port));
                let listener = TcpListener::bind(addr).await.map_err(|e| {
                    tracing::error!("Failed to bind debug listener to {}: {}", addr, e);
                    AppError::from(e)
                })?;
                Some(listener)
            }
            None => None,
        };
        let debug_port = debug_listener
            .as_ref()
            .map(|l| l.local_addr().map(|a| a.port()))
            .transpose()?;

        tracing::info!(
            port,
            debug_port,
            settings_service = %config.settings_service.url,
            "Hello service bound"
        );

        Ok(Self {
            port,
            listener,
            debug_port,
            debug_listener,
            state: AppState { config, greeter },
            registrar,
            shutdown,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Port of the health/metrics listener, when one is configured.
    pub fn debug_port(&self) -> Option<u16> {
        self.debug_port
    }

    /// Token cancelled when the server stops; pending registration retries
    /// observe it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        if self.state.config.registration.enabled {
            let registrar = self.registrar.clone();
            tokio::spawn(async move {
                let report = registrar.register_settings_bundles().await;
                tracing::debug!(
                    bundle = ?report.bundle,
                    permissions = report.permissions.len(),
                    "Settings registration pass finished"
                );
            });
        } else {
            tracing::info!("Settings bundle registration disabled by configuration");
        }

        let router = router(self.state);
        let shutdown = self.shutdown.clone();

        let debug_server = self.debug_listener.map(|listener| {
            let token = shutdown.clone();
            tokio::spawn(async move {
                axum::serve(listener, debug_router())
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
            })
        });

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
            .await;

        shutdown.cancel();
        if let Some(handle) = debug_server {
            match handle.await {
                Ok(Err(e)) => tracing::warn!("Debug server stopped with error: {}", e),
                Err(e) => tracing::warn!("Debug server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        result
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v0/greet", post(handlers::greet::greet))
        .route_layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(version_header(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    account_uuid = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health and metrics only, for the debug listener.
pub fn debug_router() -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .layer(version_header(SERVICE_NAME, env!("CARGO_PKG_VERSION")))
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
}
