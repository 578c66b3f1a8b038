// Warming Atlas - Web Server
// Read-only frame API over one shared AnomalyAtlas

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use warming_atlas::{
    format_delta, render_frame, AnomalyAtlas, AtlasConfig, Color, Frame, LegendStop, MAX_YEAR,
    MIN_YEAR,
};

/// Stops in the legend payload
const LEGEND_STEPS: usize = 11;

/// Shared application state
#[derive(Clone)]
struct AppState {
    atlas: Arc<AnomalyAtlas>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct FrameQuery {
    selected: Option<String>,
}

/// One entity at one year
#[derive(Debug, Serialize, PartialEq)]
struct EntityResponse {
    name: String,
    year: i32,
    delta: Option<f64>,
    delta_text: String,
    color: Color,
}

#[derive(Debug, Serialize)]
struct LegendResponse {
    domain: [f64; 2],
    stops: Vec<LegendStop>,
    no_data: Color,
}

fn check_year(year: i32) -> std::result::Result<(), String> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(format!("year {} outside {}..={}", year, MIN_YEAR, MAX_YEAR))
    }
}

fn frame_payload(atlas: &AnomalyAtlas, year: i32, selected: Option<&str>) -> Frame {
    // Accept raw boundary names as well as canonical ones
    let canonical = selected.map(|name| atlas.resolve(name));
    render_frame(atlas, year, canonical.as_deref())
}

fn entity_payload(atlas: &AnomalyAtlas, name: &str, year: i32) -> EntityResponse {
    let canonical = atlas.resolve(name);
    let delta = atlas.delta(&canonical, year);
    EntityResponse {
        color: atlas.scale().color_or_no_data(delta),
        delta_text: format_delta(delta),
        delta,
        year,
        name: canonical,
    }
}

fn legend_payload(atlas: &AnomalyAtlas) -> LegendResponse {
    let scale = atlas.scale();
    LegendResponse {
        domain: scale.domain(),
        stops: scale.legend(LEGEND_STEPS),
        no_data: scale.no_data_color(),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/report - How the boundary names matched the temperature table
async fn get_report(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.atlas.report().clone()))
}

/// GET /api/frames/:year?selected=Name - Full render frame for one year
async fn get_frame(
    State(state): State<AppState>,
    Path(year): Path<i32>,
    Query(query): Query<FrameQuery>,
) -> Response {
    if let Err(message) = check_year(year) {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::<Frame>::err(message))).into_response();
    }

    let frame = frame_payload(&state.atlas, year, query.selected.as_deref());
    (StatusCode::OK, Json(ApiResponse::ok(frame))).into_response()
}

/// GET /api/entities/:name/:year - Anomaly for one entity
///
/// `Path` has already percent-decoded `name`.
async fn get_entity(
    State(state): State<AppState>,
    Path((name, year)): Path<(String, i32)>,
) -> Response {
    if let Err(message) = check_year(year) {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::<EntityResponse>::err(message)))
            .into_response();
    }

    let entity = entity_payload(&state.atlas, &name, year);
    (StatusCode::OK, Json(ApiResponse::ok(entity))).into_response()
}

/// GET /api/legend - Frozen color domain + stops
async fn get_legend(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(legend_payload(&state.atlas)))
}

fn router(atlas: Arc<AnomalyAtlas>) -> Router {
    let state = AppState { atlas };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/report", get(get_report))
        .route("/frames/:year", get(get_frame))
        .route("/entities/:name/:year", get(get_entity))
        .route("/legend", get(get_legend))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warming_atlas=info,atlas_server=info")),
        )
        .init();

    println!("🌐 Warming Atlas - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = match std::env::args().nth(1) {
        Some(path) => AtlasConfig::from_file(&path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => AtlasConfig::default(),
    };

    let atlas = config.load_atlas()?;
    println!("✓ {}", atlas.report().summary());

    let app = router(Arc::new(atlas));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_addr))?;

    info!(addr = %config.server_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.server_addr);
    println!("   API: http://{}/api/frames/2000", config.server_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
