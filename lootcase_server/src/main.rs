use anyhow::Context;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lootcase_core::{
    session_rng, Catalog, Item, Money, OpenRecord, Opened, RarityColors, SessionConfig,
    SessionError, SessionHandle, SessionSnapshot,
};
use lootcase_shared::{
    ApiError, CaseSummary, CatalogResponse, ErrorBody, ItemView, OpenLogEntry, OpenResponse,
    OpenStatus, SelectCaseRequest, SessionView,
};

struct AppState {
    session: SessionHandle,
}

/// Settings read from the environment at startup.
#[derive(Debug)]
struct ServerConfig {
    bind: String,
    catalog_path: Option<String>,
    session: SessionConfig,
    seed_phrase: Option<String>,
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        let mut session = SessionConfig::default();
        if let Ok(raw) = std::env::var("STARTING_BALANCE") {
            session.starting_balance = parse_starting_balance(&raw)?;
        }
        if let Ok(raw) = std::env::var("REVEAL_DELAY_MS") {
            let ms: u64 = raw.parse().context("REVEAL_DELAY_MS must be an integer")?;
            session.reveal_delay = Duration::from_millis(ms);
        }
        Ok(Self {
            bind: std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            catalog_path: std::env::var("LOOTCASE_CATALOG").ok(),
            session,
            seed_phrase: std::env::var("SEED_PHRASE").ok(),
        })
    }
}

fn parse_starting_balance(raw: &str) -> anyhow::Result<Money> {
    let amount: f64 = raw.parse().context("STARTING_BALANCE must be a number")?;
    Money::from_f64(amount)
        .filter(|m| !m.is_negative())
        .with_context(|| format!("STARTING_BALANCE must be between 0 and {}, got {raw}", Money::MAX))
}

struct HttpError(ApiError);

impl From<SessionError> for HttpError {
    fn from(e: SessionError) -> Self {
        HttpError(match e {
            SessionError::InsufficientFunds { .. } => ApiError::InsufficientFunds(e.to_string()),
            SessionError::InvalidStateTransition { .. } | SessionError::BalanceOverflow { .. } => {
                ApiError::InvalidState(e.to_string())
            }
            SessionError::UnknownCase(_) => ApiError::NotFound(e.to_string()),
            SessionError::EmptyCase(_) | SessionError::RevealLost => {
                error!(error = %e, "session failure");
                ApiError::Internal
            }
        })
    }
}

fn status_of(e: &ApiError) -> StatusCode {
    match e {
        ApiError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
        ApiError::InvalidState(_) => StatusCode::CONFLICT,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status_of(&self.0), Json(body)).into_response()
    }
}

fn item_view(item: &Item, colors: &RarityColors) -> ItemView {
    ItemView {
        name: item.name.clone(),
        rarity: item.rarity.to_string(),
        color: colors.resolve(item.rarity).to_string(),
        price: item.price.as_f64(),
    }
}

fn session_view(snapshot: &SessionSnapshot, colors: &RarityColors) -> SessionView {
    SessionView {
        balance: snapshot.balance.as_f64(),
        phase: snapshot.phase.as_str().to_string(),
        selected_case: snapshot.selected_case.as_ref().map(|c| c.id.clone()),
        reel: snapshot
            .reel
            .as_ref()
            .map(|r| r.items.iter().map(|i| item_view(i, colors)).collect()),
        winning_index: snapshot.reel.as_ref().map(|r| r.winning_index),
        result: snapshot.result.as_ref().map(|i| item_view(i, colors)),
    }
}

fn log_entry(record: &OpenRecord) -> OpenLogEntry {
    OpenLogEntry {
        sequence: record.sequence,
        ts: record.revealed_at,
        case_id: record.case_id.clone(),
        case_price: record.price.as_f64(),
        item_name: record.item.name.clone(),
        item_rarity: record.item.rarity.to_string(),
        item_price: record.item.price.as_f64(),
        balance: record.balance.as_f64(),
    }
}

async fn current_view(state: &AppState) -> SessionView {
    let snapshot = state.session.snapshot().await;
    session_view(&snapshot, &state.session.catalog().rarity_colors)
}

async fn route_cases(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let catalog = state.session.catalog();
    let cases = catalog
        .cases
        .iter()
        .map(|c| CaseSummary {
            id: c.id.clone(),
            name: c.name.clone(),
            price: c.price.as_f64(),
            image: c.image.clone(),
            items: c
                .items
                .iter()
                .map(|i| item_view(i, &catalog.rarity_colors))
                .collect(),
        })
        .collect();
    Json(CatalogResponse { cases })
}

async fn route_session(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(current_view(&state).await)
}

async fn route_select(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SelectCaseRequest>,
) -> Result<Json<SessionView>, HttpError> {
    state.session.select_case(&req.case_id).await?;
    Ok(Json(current_view(&state).await))
}

async fn route_open(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<OpenResponse>), HttpError> {
    match state.session.open_case().await? {
        // the reveal fires on its own schedule; clients poll /session for it
        Opened::Started { ticket, reveal: _ } => {
            let colors = &state.session.catalog().rarity_colors;
            Ok((
                StatusCode::OK,
                Json(OpenResponse {
                    status: OpenStatus::Started,
                    reel: ticket.reel.items.iter().map(|i| item_view(i, colors)).collect(),
                    winning_index: Some(ticket.reel.winning_index),
                    balance: Some(ticket.balance.as_f64()),
                    reveal_after_ms: Some(ticket.reveal_after.as_millis() as u64),
                }),
            ))
        }
        Opened::AlreadyOpening => Ok((StatusCode::ACCEPTED, Json(OpenResponse::already_opening()))),
    }
}

async fn route_open_again(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, HttpError> {
    state.session.open_again().await?;
    Ok(Json(current_view(&state).await))
}

async fn route_change_case(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionView>, HttpError> {
    state.session.change_case().await?;
    Ok(Json(current_view(&state).await))
}

async fn route_history(State(state): State<Arc<AppState>>) -> Json<Vec<OpenLogEntry>> {
    let history = state.session.history().await;
    Json(history.iter().map(log_entry).collect())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cases", get(route_cases))
        .route("/session", get(route_session))
        .route("/session/select", post(route_select))
        .route("/session/open", post(route_open))
        .route("/session/open-again", post(route_open_again))
        .route("/session/change-case", post(route_change_case))
        .route("/session/history", get(route_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path).with_context(|| format!("loading catalog {path}"))?,
        None => Catalog::builtin(),
    };
    info!(cases = catalog.cases.len(), "catalog ready");

    let rng = session_rng(config.seed_phrase.as_deref());
    let state = Arc::new(AppState {
        session: SessionHandle::new(Arc::new(catalog), config.session, rng),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
