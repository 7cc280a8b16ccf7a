use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use sastlink_auth::{
    AuthorizationCodeStorage, ClientRegistry, ClientStorage, CredentialGate, JwtIdentityVerifier,
    MemoryClientStorage, MemoryCodeStorage, MemorySessionStorage, OAuthServer, OAuthState,
    SessionStorage, authorize_get, authorize_post, create_client_handler, init_server_handler,
    user_auth_handler,
};
use sastlink_auth_postgres::PostgresAuthStorage;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::{
    config::{AppConfig, StorageBackend},
    handlers,
};

pub struct SastLinkServer {
    addr: SocketAddr,
    app: Router,
    background: Vec<JoinHandle<()>>,
}

type Storages = (
    Arc<dyn ClientStorage>,
    Arc<dyn AuthorizationCodeStorage>,
    Arc<dyn SessionStorage>,
);

async fn build_storage(cfg: &AppConfig) -> anyhow::Result<Storages> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; clients and sessions are lost on restart");
            Ok((
                Arc::new(MemoryClientStorage::new()),
                Arc::new(MemoryCodeStorage::new()),
                Arc::new(MemorySessionStorage::new()),
            ))
        }
        StorageBackend::Postgres => {
            let pg = &cfg.storage.postgres;
            let url = pg
                .url
                .as_deref()
                .context("storage.postgres.url is not set")?;
            let storage = PostgresAuthStorage::connect(url, pg.pool_size)
                .await
                .context("failed to connect to PostgreSQL")?;
            if pg.ensure_schema {
                storage
                    .ensure_schema()
                    .await
                    .context("failed to create auth tables")?;
            }
            tracing::info!(pool_size = pg.pool_size, "PostgreSQL storage ready");
            Ok((
                Arc::new(storage.clients()),
                Arc::new(storage.codes()),
                Arc::new(storage.sessions()),
            ))
        }
    }
}

/// Wires storage, the credential gate and the one engine instance.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<OAuthState> {
    let (clients, codes, sessions) = build_storage(cfg).await?;

    let verifier = JwtIdentityVerifier::from_config(&cfg.oauth.identity)?;
    let gate = CredentialGate::new(&cfg.oauth.token_header, verifier)?;

    let server = Arc::new(OAuthServer::new(
        ClientRegistry::new(clients),
        codes,
        Arc::new(gate),
        cfg.oauth.clone(),
    ));
    tracing::info!(
        storage.backend = ?cfg.storage.backend,
        oauth.login_url = %cfg.oauth.login_url,
        "Authorization engine initialized"
    );

    Ok(OAuthState::new(server, sessions))
}

pub fn build_app(state: OAuthState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/oauth/client", post(create_client_handler))
        .route("/oauth/init", get(init_server_handler))
        .route("/oauth/authorize", get(authorize_get).post(authorize_post))
        .route("/oauth/user-auth", get(user_auth_handler))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Builds the state and starts the storage sweeps.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> anyhow::Result<SastLinkServer> {
        let state = build_state(&self.config).await?;
        let background = vec![state.server().spawn_code_gc(), state.spawn_session_gc()];
        let app = build_app(state, &self.config);

        Ok(SastLinkServer {
            addr: self.addr,
            app,
            background,
        })
    }
}

impl SastLinkServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        for task in &self.background {
            task.abort();
        }
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
