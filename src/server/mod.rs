use std::io;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::data::access::{AccessList, LanguagePrefs};
use crate::freshness::SystemClock;
use crate::reconcile::ReportService;

pub mod api;
pub mod routes;

use routes::HttpResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to load user state: {0}")]
    UserState(#[from] io::Error),
}

/// Everything a request handler needs, shared across requests.
pub struct AppContext {
    pub config: Config,
    pub service: ReportService,
    pub access: Mutex<AccessList>,
    pub prefs: Mutex<LanguagePrefs>,
}

impl AppContext {
    pub fn from_config(config: Config) -> Result<Self, ServerError> {
        let service = ReportService::new(
            config.store_path.clone(),
            config.grammar()?,
            Box::new(SystemClock),
            config.zone()?,
        );
        let access = AccessList::load(config.access_list_path.clone())?;
        let prefs = LanguagePrefs::load(config.language_prefs_path.clone())?;
        if config.require_authorization && access.is_empty() {
            log::warn!(
                "authorization is required but {} lists no users",
                config.access_list_path.display()
            );
        }
        Ok(AppContext {
            config,
            service,
            access: Mutex::new(access),
            prefs: Mutex::new(prefs),
        })
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// All paths go through [`routes::route_request`]; store access is blocking, so each request
/// runs on the blocking pool.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new().fallback(dispatch).with_state(ctx)
}

async fn dispatch(
    State(ctx): State<Arc<AppContext>>,
    method: Method,
    uri: Uri,
    body: String,
) -> HttpResponse {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let method = method.as_str().to_string();
    let handled =
        tokio::task::spawn_blocking(move || routes::route_request(&ctx, &method, &path, &body))
            .await;
    match handled {
        Ok(response) => response,
        Err(err) => {
            log::error!("request handler failed: {err}");
            routes::error_response(500, "request handler failed")
        }
    }
}

pub fn run_server(ctx: Arc<AppContext>, bind_addr: &str) -> io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        log::info!("tilewatch server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, build_router(ctx)).await
    })
}
