//! REST API for the slab optimizer.
//!
//! Provides HTTP endpoints for layout requests, live progress and SVG export.
//! Uses Axum as the web framework and supports CORS.

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::{ApiConfig, OptimizerConfig, unit_factor_from_units};
use crate::error::PackingError;
use crate::free_space::{FitPolicy, SplitRule};
use crate::layout::{Layout, LayoutMetrics};
use crate::model::{Orientation, PartSpec, PlacedPart};
use crate::optimizer::{
    PackEvent, PackingConfig, pack_best_of, pack_parts, pack_parts_with_progress,
};
use crate::ordering::OrderingKey;
use crate::parts_csv::parse_parts_csv;
use crate::render::{SvgDrawOptions, layout_to_svg_string};
use crate::units::LengthUnit;

#[derive(Clone)]
struct ApiState {
    optimizer_config: OptimizerConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>slab-optimizer API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the packing endpoints.
///
/// Every configuration field is optional and overrides the service default.
/// Give either `unit_factor` or the named units `part_unit`/`slab_unit`.
#[derive(Deserialize, Clone, Debug, Default, ToSchema)]
#[schema(
    example = json!({
        "parts": [
            { "label": "island top", "length": 7.0, "width": 3.5, "quantity": 8 },
            { "label": "bath 2", "length": 2.0, "width": 1.75, "quantity": 8 }
        ],
        "slab_width": 64.0,
        "slab_height": 127.0,
        "kerf": 0.5,
        "part_unit": "feet",
        "slab_unit": "inches",
        "best_of": true
    })
)]
pub struct PackRequest {
    pub parts: Vec<PartSpec>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub slab_width: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub slab_height: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub kerf: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub unit_factor: Option<f64>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub part_unit: Option<LengthUnit>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub slab_unit: Option<LengthUnit>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub ordering_key: Option<OrderingKey>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub fit_policy: Option<FitPolicy>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub split_rule: Option<SplitRule>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub allow_rotation: Option<bool>,
    /// Evaluates every ordering key and fit policy and keeps the fewest slabs.
    #[serde(default)]
    pub best_of: bool,
}

impl PackRequest {
    /// Applies the request overrides to `base`.
    fn resolve_config(&self, base: PackingConfig) -> Result<PackingConfig, String> {
        let named_units = self.part_unit.is_some() || self.slab_unit.is_some();
        if named_units && self.unit_factor.is_some() {
            return Err("Give either unit_factor or part_unit/slab_unit, not both".to_string());
        }

        let unit_factor = match self.unit_factor {
            Some(factor) => factor,
            None if named_units => unit_factor_from_units(self.part_unit, self.slab_unit),
            None => base.unit_factor,
        };

        Ok(PackingConfig {
            slab_width: self.slab_width.unwrap_or(base.slab_width),
            slab_height: self.slab_height.unwrap_or(base.slab_height),
            kerf: self.kerf.unwrap_or(base.kerf),
            unit_factor,
            ordering_key: self.ordering_key.unwrap_or(base.ordering_key),
            fit_policy: self.fit_policy.unwrap_or(base.fit_policy),
            split_rule: self.split_rule.unwrap_or(base.split_rule),
            allow_rotation: self.allow_rotation.unwrap_or(base.allow_rotation),
        })
    }

    fn into_validated(self, base: PackingConfig) -> Result<ValidatedPackRequest, Response> {
        let config = self.resolve_config(base).map_err(validation_error)?;
        config.validate().map_err(|err| packing_error(&err))?;
        Ok(ValidatedPackRequest {
            parts: self.parts,
            config,
            best_of: self.best_of,
        })
    }
}

/// Query parameters of `/pack_csv`; the same overrides as [`PackRequest`].
#[derive(Deserialize, Clone, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PackCsvQuery {
    pub slab_width: Option<f64>,
    pub slab_height: Option<f64>,
    pub kerf: Option<f64>,
    pub unit_factor: Option<f64>,
    pub part_unit: Option<LengthUnit>,
    pub slab_unit: Option<LengthUnit>,
    pub ordering_key: Option<OrderingKey>,
    pub fit_policy: Option<FitPolicy>,
    pub split_rule: Option<SplitRule>,
    pub allow_rotation: Option<bool>,
    #[serde(default)]
    pub best_of: bool,
}

impl PackCsvQuery {
    fn into_request(self, parts: Vec<PartSpec>) -> PackRequest {
        PackRequest {
            parts,
            slab_width: self.slab_width,
            slab_height: self.slab_height,
            kerf: self.kerf,
            unit_factor: self.unit_factor,
            part_unit: self.part_unit,
            slab_unit: self.slab_unit,
            ordering_key: self.ordering_key,
            fit_policy: self.fit_policy,
            split_rule: self.split_rule,
            allow_rotation: self.allow_rotation,
            best_of: self.best_of,
        }
    }
}

#[derive(Debug)]
struct ValidatedPackRequest {
    parts: Vec<PartSpec>,
    config: PackingConfig,
    best_of: bool,
}

impl ValidatedPackRequest {
    fn unit_count(&self) -> u64 {
        self.parts.iter().map(|p| u64::from(p.quantity)).sum()
    }

    /// Packs the request and returns the layout with the configuration that produced it.
    fn run(&self) -> Result<(Layout, PackingConfig), PackingError> {
        if self.best_of {
            let best = pack_best_of(&self.parts, &self.config)?;
            Ok((best.layout, best.config))
        } else {
            let layout = pack_parts(&self.parts, &self.config)?;
            Ok((layout, self.config))
        }
    }
}

/// Response structure with all used slabs.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub slabs: Vec<PackedSlab>,
    pub metrics: LayoutMetrics,
    /// Configuration that produced this layout, after overrides and variant selection.
    pub config: PackingConfig,
}

/// One slab with its parts.
///
/// # Fields
/// * `index` - Slab number (0-based, creation order)
/// * `used_area` - Finished part area on this slab
/// * `utilization` - `used_area` relative to the slab area, in percent
#[derive(Serialize, ToSchema)]
pub struct PackedSlab {
    pub index: usize,
    pub width: f64,
    pub height: f64,
    pub used_area: f64,
    pub padded_area: f64,
    pub utilization: f64,
    pub placed: Vec<PlacedPart>,
}

impl PackResponse {
    pub fn from_layout(layout: Layout, config: PackingConfig) -> Self {
        let slabs = layout
            .slabs
            .iter()
            .map(|slab| PackedSlab {
                index: slab.index,
                width: slab.width,
                height: slab.height,
                used_area: slab.used_area(),
                padded_area: slab.padded_area(),
                utilization: slab.utilization_percent(),
                placed: slab.placed().to_vec(),
            })
            .collect();

        Self {
            slabs,
            metrics: layout.metrics,
            config,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    /// Machine-readable error code, e.g. `part_too_large`.
    code: String,
    details: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    version: String,
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    code: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    let body = ErrorResponse {
        error: error.into(),
        code: code.into(),
        details: details.into(),
    };
    (status, Json(body)).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        "invalid_json",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        "invalid_request",
        details,
    )
}

fn packing_error(err: &PackingError) -> Response {
    let error = match err {
        PackingError::Configuration(_) => "Invalid slab configuration",
        PackingError::InvalidPart { .. } => "Invalid part",
        PackingError::PartTooLarge { .. } => "Part does not fit the slab",
        PackingError::TooManyUnits { .. } => "Too many parts",
    };
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        error,
        err.code(),
        err.to_string(),
    )
}

/// Stream message sent in place of `Finished` when a run aborts.
fn failed_event(err: &PackingError) -> String {
    json!({
        "type": "Failed",
        "code": err.code(),
        "error": err.to_string(),
    })
    .to_string()
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
    base: PackingConfig,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = payload.map_err(json_deserialize_error)?;
    payload.into_validated(base)
}

/// Runs a request on the blocking pool and maps the outcome to a response.
async fn run_blocking(
    request: ValidatedPackRequest,
    respond: impl FnOnce(Layout, PackingConfig) -> Response,
) -> Response {
    let outcome = tokio::task::spawn_blocking(move || request.run()).await;
    match outcome {
        Ok(Ok((layout, config))) => {
            info!(
                "Result: {} parts on {} slabs",
                layout.part_count(),
                layout.slab_count()
            );
            respond(layout, config)
        }
        Ok(Err(err)) => {
            warn!("Packing failed: {err}");
            packing_error(&err)
        }
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Packing task failed",
            "internal_error",
            err.to_string(),
        ),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_csv, handle_pack_stream, handle_pack_svg, handle_health),
    components(
        schemas(
            PackRequest,
            PackResponse,
            PackedSlab,
            PartSpec,
            PlacedPart,
            Orientation,
            LayoutMetrics,
            PackingConfig,
            OrderingKey,
            FitPolicy,
            SplitRule,
            LengthUnit,
            PackEvent,
            ErrorResponse,
            HealthResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for slab layout optimization"))
)]
struct ApiDoc;

fn build_router(optimizer_config: OptimizerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { optimizer_config };

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_csv", post(handle_pack_csv))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/pack_svg", post(handle_pack_svg))
        .route("/health", get(handle_health))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
///
/// Configures CORS for cross-origin requests from browser clients.
pub async fn start_api_server(
    config: ApiConfig,
    optimizer_config: OptimizerConfig,
) -> anyhow::Result<()> {
    let app = build_router(optimizer_config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind API server to {addr}"))?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!(
        "Endpoints: POST /pack, POST /pack_csv, POST /pack_stream, POST /pack_svg, GET /health, GET /docs"
    );

    axum::serve(listener, app)
        .await
        .context("API server terminated with an error")
}

/// Handler for POST /pack endpoint.
///
/// Packs the requested parts onto as few slabs as possible.
///
/// # Parameters
/// * `payload` - JSON payload with parts and optional configuration overrides
///
/// # Returns
/// JSON response with all used slabs, their parts and the layout metrics
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Successfully packed parts", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, part or slab configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, state.optimizer_config.packing_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "New pack request: {} part types, {} pieces",
        request.parts.len(),
        request.unit_count()
    );
    run_blocking(request, |layout, config| {
        (StatusCode::OK, Json(PackResponse::from_layout(layout, config))).into_response()
    })
    .await
}

/// Handler for POST /pack_csv endpoint.
///
/// Packs a part list uploaded as CSV (`Label,Length (ft),Width (ft),Quantity`).
/// Configuration overrides are given as query parameters.
#[utoipa::path(
    post,
    path = "/pack_csv",
    params(PackCsvQuery),
    request_body(content = String, content_type = "text/csv", description = "Part list with header row"),
    responses(
        (status = 200, description = "Successfully packed parts", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid CSV, query, part or slab configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_csv(
    State(state): State<ApiState>,
    query: Result<Query<PackCsvQuery>, QueryRejection>,
    body: String,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(err) => return validation_error(err.body_text()),
    };
    let parts = match parse_parts_csv(&body) {
        Ok(parts) => parts,
        Err(err) => {
            warn!("Rejected CSV upload: {err}");
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid CSV data",
                "invalid_csv",
                err.to_string(),
            );
        }
    };
    let request = match query
        .into_request(parts)
        .into_validated(state.optimizer_config.packing_config())
    {
        Ok(request) => request,
        Err(response) => return response,
    };

    info!(
        "New CSV pack request: {} part types, {} pieces",
        request.parts.len(),
        request.unit_count()
    );
    run_blocking(request, |layout, config| {
        (StatusCode::OK, Json(PackResponse::from_layout(layout, config))).into_response()
    })
    .await
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events as Server-Sent Events. With `best_of` the winning
/// variant is chosen first and then replayed with events. A run that aborts
/// ends with a `Failed` event instead of `Finished`.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or slab configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, state.optimizer_config.packing_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let config = if request.best_of {
            match pack_best_of(&request.parts, &request.config) {
                Ok(best) => best.config,
                Err(err) => {
                    let _ = tx.blocking_send(failed_event(&err));
                    return;
                }
            }
        } else {
            request.config
        };

        let result = pack_parts_with_progress(&request.parts, &config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only means the client went away.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = result {
            let _ = tx.blocking_send(failed_event(&err));
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /pack_svg endpoint.
///
/// Packs like `/pack` and returns the layout drawing.
#[utoipa::path(
    post,
    path = "/pack_svg",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Layout drawing", content_type = "image/svg+xml", body = String),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, part or slab configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_svg(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload, state.optimizer_config.packing_config()) {
        Ok(request) => request,
        Err(response) => return response,
    };

    run_blocking(request, |layout, _| {
        let svg = layout_to_svg_string(&layout, SvgDrawOptions::default());
        ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response()
    })
    .await
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is running", body = HealthResponse)),
    tag = "packing"
)]
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
