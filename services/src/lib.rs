use crate::config::Config;
use crate::database::SqlStorage;
use crate::error::ErrorResponse;
use crate::users::{AppState, UserStorage};
use axum::{
    Json, Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod config;
pub mod database;
pub mod entries;
pub mod error;
pub mod export;
pub mod flash;
pub mod reports;
pub mod telemetry;
pub mod users;
pub mod version;

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the complete application router over the given storages.
pub async fn routes<S, U>(sql_storage: S, user_storage: U, config: Config) -> Router
where
    S: SqlStorage,
    U: UserStorage,
{
    let state = AppState::new(sql_storage, user_storage);

    Router::new()
        .route("/is-health", get(health_check::<S, U>))
        .merge(users::auth_routes::<S, U>())
        .merge(reports::report_routes::<S, U>())
        .merge(entries::entry_routes::<S, U>())
        .merge(export::export_routes::<S, U>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Join the caller's trace when one is propagated
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(header::USER_AGENT),
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn health_check<S, U>(
    State(state): State<AppState<S, U>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    S: SqlStorage,
    U: UserStorage,
{
    let mut response = if state.sql_storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        tracing::warn!("Health check failed: database unreachable");
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let headers = [
        ("x-service-env", config.environment().to_string()),
        (
            "x-service-version",
            version::service_version(*config.environment()),
        ),
    ];
    for (name, value) in headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(name), value);
        }
    }

    response
}

async fn catch_all() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_owned(),
            message: "nothing to see here".to_owned(),
        }),
    )
}
