//! REST API for the parcel packing service.
//!
//! Provides the quote endpoints used at checkout and the box type admin
//! endpoints. Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::catalog::{BoxCatalog, BoxTypeRecord, CatalogError};
use crate::config::{ApiConfig, OptimizerConfig};
use crate::model::{BoxType, BoxTypeInput, CartLine, Parcel, ValidationError};
use crate::optimizer::{
    PackEvent, PackingResult, count_units, pack_cart_with_config, pack_cart_with_progress,
};

#[derive(Clone)]
pub struct ApiState {
    optimizer_config: OptimizerConfig,
    catalog: BoxCatalog,
}

impl ApiState {
    pub fn new(optimizer_config: OptimizerConfig, catalog: BoxCatalog) -> Self {
        Self {
            optimizer_config,
            catalog,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>parcel-packer API Docs</title>
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
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request structure for the quote endpoints.
///
/// `box_types` replaces the stored catalog for this request only.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "quantity": 2, "weight_grams": 800, "length_cm": 15, "width_cm": 15, "height_cm": 10 }
        ]
    })
)]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    #[serde(default, alias = "boxTypes")]
    #[schema(nullable = true)]
    pub box_types: Option<Vec<BoxTypeInput>>,
}

#[derive(Debug)]
struct ValidatedQuoteRequest {
    items: Vec<CartLine>,
    box_types: Option<Vec<BoxType>>,
    unit_count: u64,
}

impl QuoteRequest {
    fn into_validated(self, max_units: u64) -> Result<ValidatedQuoteRequest, ApiError> {
        let unit_count = count_units(&self.items);
        if unit_count > max_units {
            return Err(ApiError::TooManyUnits {
                units: unit_count,
                limit: max_units,
            });
        }

        let box_types = self
            .box_types
            .map(|inputs| {
                inputs
                    .iter()
                    .map(|input| input.validate().map(|(box_type, _)| box_type))
                    .collect::<Result<Vec<_>, ValidationError>>()
            })
            .transpose()?;

        Ok(ValidatedQuoteRequest {
            items: self.items,
            box_types,
            unit_count,
        })
    }
}

/// Response with the parcels to pass to the carrier.
#[derive(Serialize, ToSchema)]
pub struct QuoteResponse {
    pub parcels: Vec<Parcel>,
    pub packages: Vec<PackageSummary>,
    pub fallback_count: usize,
    pub unit_count: usize,
    pub average_utilization: f64,
}

/// Contents of one catalog box in the quote.
#[derive(Serialize, ToSchema)]
pub struct PackageSummary {
    pub box_type: String,
    pub content_weight: u64,
    pub content_volume: u64,
    pub capacity_volume: u64,
    pub unit_count: usize,
    pub utilization_percent: f64,
}

impl QuoteResponse {
    pub fn from_packing_result(result: PackingResult) -> Self {
        let parcels = result.parcels();
        let fallback_count = result.fallback_count();
        let average_utilization = result.average_utilization();
        let packages = result
            .boxes
            .iter()
            .map(|state| PackageSummary {
                box_type: state.box_type.name.clone(),
                content_weight: state.total_weight_grams,
                content_volume: state.total_volume_cm3,
                capacity_volume: state.box_type.capacity_volume(),
                unit_count: state.unit_count,
                utilization_percent: state.utilization_percent(),
            })
            .collect();

        Self {
            parcels,
            packages,
            fallback_count,
            unit_count: result.unit_count,
            average_utilization,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON data")]
    InvalidJson(String),
    #[error("Invalid box type")]
    InvalidBoxType(#[from] ValidationError),
    #[error("Too many units")]
    TooManyUnits { units: u64, limit: u64 },
    #[error("Not found")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_)
            | ApiError::InvalidBoxType(_)
            | ApiError::TooManyUnits { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn details(&self) -> String {
        match self {
            ApiError::InvalidJson(details) | ApiError::NotFound(details) => details.clone(),
            ApiError::InvalidBoxType(err) => err.to_string(),
            ApiError::TooManyUnits { units, limit } => format!(
                "The cart expands to {} units, at most {} are allowed",
                units, limit
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::debug!("Rejected request: {}: {}", self, self.details());
        }
        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::InvalidJson(err.body_text())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => {
                ApiError::NotFound(format!("Box type {} does not exist", id))
            }
            CatalogError::Invalid(err) => ApiError::InvalidBoxType(err),
        }
    }
}

fn box_type_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|err| ApiError::NotFound(err.body_text()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_quote,
        handle_quote_stream,
        list_box_types,
        create_box_type,
        update_box_type,
        delete_box_type
    ),
    components(
        schemas(
            QuoteRequest,
            QuoteResponse,
            PackageSummary,
            CartLine,
            Parcel,
            PackEvent,
            BoxType,
            BoxTypeInput,
            BoxTypeRecord,
            ErrorResponse
        )
    ),
    tags(
        (name = "quote", description = "Parcel sizing for shipping quotes"),
        (name = "box-types", description = "Box type catalog administration")
    )
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Quote endpoints
        .route("/parcels", post(handle_quote))
        .route("/parcels_stream", post(handle_quote_stream))
        // Catalog administration
        .route("/box-types", get(list_box_types).post(create_box_type))
        .route(
            "/box-types/{id}",
            put(update_box_type).delete(delete_box_type),
        )
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, state: ApiState) -> std::io::Result<()> {
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        tracing::info!("💡 Local access: http://localhost:{}", config.port());
    }
    tracing::info!("📦 Quote: POST /parcels, POST /parcels_stream");
    tracing::info!("🗃️ Catalog: GET/POST /box-types, PUT/DELETE /box-types/{{id}}");
    tracing::info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn prepare_quote(
    state: &ApiState,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<(Vec<CartLine>, Vec<BoxType>), ApiError> {
    let Json(payload) = payload?;
    let request = payload.into_validated(state.optimizer_config.max_units())?;

    let catalog = match request.box_types {
        Some(box_types) => box_types,
        None => state.catalog.snapshot().await,
    };
    tracing::info!(
        "📥 New quote request: {} lines, {} units, {} box types",
        request.items.len(),
        request.unit_count,
        catalog.len()
    );
    Ok((request.items, catalog))
}

/// Handler for POST /parcels.
///
/// Packs the cart into parcels for a carrier tariff request.
#[utoipa::path(
    post,
    path = "/parcels",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Parcels for the cart", body = QuoteResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, box types or too many units",
            body = ErrorResponse
        )
    ),
    tag = "quote"
)]
async fn handle_quote(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let (items, catalog) = prepare_quote(&state, payload).await?;

    let packing_config = state.optimizer_config.packing_config();
    let result = pack_cart_with_config(&items, &catalog, &packing_config);
    tracing::info!(
        "📦 Result: {} parcels ({} boxes, {} fallback)",
        result.parcel_count(),
        result.box_count(),
        result.fallback_count()
    );

    Ok(Json(QuoteResponse::from_packing_result(result)))
}

/// Handler for POST /parcels_stream (SSE).
///
/// Streams pack events as Server-Sent Events while the quote is built.
#[utoipa::path(
    post,
    path = "/parcels_stream",
    request_body = QuoteRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = PackEvent
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, box types or too many units",
            body = ErrorResponse
        )
    ),
    tag = "quote"
)]
async fn handle_quote_stream(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let (items, catalog) = prepare_quote(&state, payload).await?;
    let packing_config = state.optimizer_config.packing_config();

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let _ = pack_cart_with_progress(&items, &catalog, &packing_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away; later events are dropped.
                let _ = tx.blocking_send(json);
            }
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Ok(Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response())
}

/// Handler for GET /box-types.
#[utoipa::path(
    get,
    path = "/box-types",
    responses((status = 200, description = "Catalog in selection order", body = [BoxTypeRecord])),
    tag = "box-types"
)]
async fn list_box_types(State(state): State<ApiState>) -> Json<Vec<BoxTypeRecord>> {
    Json(state.catalog.list_box_types().await)
}

/// Handler for POST /box-types.
#[utoipa::path(
    post,
    path = "/box-types",
    request_body = BoxTypeInput,
    responses(
        (status = 201, description = "Box type created", body = BoxTypeRecord),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid box type", body = ErrorResponse)
    ),
    tag = "box-types"
)]
async fn create_box_type(
    State(state): State<ApiState>,
    payload: Result<Json<BoxTypeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<BoxTypeRecord>), ApiError> {
    let Json(input) = payload?;
    let record = state.catalog.create_box_type(&input).await?;
    tracing::info!(
        "🗃️ Box type created: {} ({})",
        record.box_type.name,
        record.id
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for PUT /box-types/{id}.
#[utoipa::path(
    put,
    path = "/box-types/{id}",
    params(("id" = Uuid, Path, description = "Box type id")),
    request_body = BoxTypeInput,
    responses(
        (status = 200, description = "Box type updated", body = BoxTypeRecord),
        (status = NOT_FOUND, description = "Unknown box type", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid box type", body = ErrorResponse)
    ),
    tag = "box-types"
)]
async fn update_box_type(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<BoxTypeInput>, JsonRejection>,
) -> Result<Json<BoxTypeRecord>, ApiError> {
    let id = box_type_id(path)?;
    let Json(input) = payload?;
    let record = state.catalog.update_box_type(id, &input).await?;
    tracing::info!("🗃️ Box type updated: {} ({})", record.box_type.name, id);
    Ok(Json(record))
}

/// Handler for DELETE /box-types/{id}.
#[utoipa::path(
    delete,
    path = "/box-types/{id}",
    params(("id" = Uuid, Path, description = "Box type id")),
    responses(
        (status = 200, description = "Box type deleted", body = BoxTypeRecord),
        (status = NOT_FOUND, description = "Unknown box type", body = ErrorResponse)
    ),
    tag = "box-types"
)]
async fn delete_box_type(
    State(state): State<ApiState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BoxTypeRecord>, ApiError> {
    let id = box_type_id(path)?;
    let record = state.catalog.delete_box_type(id).await?;
    tracing::info!("🗃️ Box type deleted: {} ({})", record.box_type.name, id);
    Ok(Json(record))
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use crate::optimizer::PackingConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> ApiState {
        ApiState::new(
            OptimizerConfig::default(),
            BoxCatalog::seeded(BoxType::default_catalog()),
        )
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/parcels", "/parcels_stream", "/box-types", "/box-types/{id}"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["QuoteRequest", "QuoteResponse", "Parcel", "BoxTypeRecord", "ErrorResponse"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn quote_request_accepts_camel_case_items() {
        let json = r#"{
            "items": [{"quantity": 1, "weightGrams": 300, "lengthCm": 5, "widthCm": 6, "heightCm": 7}]
        }"#;
        let request: QuoteRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.items[0].weight_grams, Some(300.0));
        assert_eq!(request.items[0].height_cm, Some(7.0));
        assert!(request.box_types.is_none());
    }

    #[test]
    fn validation_rejects_too_many_units() {
        let request = QuoteRequest {
            items: vec![
                CartLine::new(6.0, 100.0, (1.0, 1.0, 1.0)),
                CartLine::new(5.0, 100.0, (1.0, 1.0, 1.0)),
            ],
            box_types: None,
        };
        let err = request.into_validated(10).expect_err("11 units exceed 10");
        assert!(matches!(
            err,
            ApiError::TooManyUnits {
                units: 11,
                limit: 10
            }
        ));
    }

    #[test]
    fn validation_rejects_invalid_box_type_override() {
        let mut input = BoxTypeInput::from(&BoxType::default_catalog()[0]);
        input.fill_ratio = 2.0;
        let request = QuoteRequest {
            items: Vec::new(),
            box_types: Some(vec![input]),
        };
        assert!(matches!(
            request.into_validated(10),
            Err(ApiError::InvalidBoxType(ValidationError::InvalidFillRatio(_)))
        ));
    }

    #[tokio::test]
    async fn quote_packs_with_stored_catalog() {
        let body = json!({
            "items": [
                { "quantity": 2, "weight_grams": 800, "length_cm": 15, "width_cm": 15, "height_cm": 10 }
            ]
        });
        let (status, value) = send(router(test_state()), json_request("POST", "/parcels", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value["parcels"],
            json!([
                { "length": 20, "width": 15, "height": 10, "weight": 920 },
                { "length": 20, "width": 15, "height": 10, "weight": 920 }
            ])
        );
        assert_eq!(value["packages"][0]["box_type"], "S");
        assert_eq!(value["unit_count"], 2);
        assert_eq!(value["fallback_count"], 0);
    }

    #[tokio::test]
    async fn quote_for_empty_cart_returns_default_parcel() {
        let (status, value) = send(
            router(test_state()),
            json_request("POST", "/parcels", json!({ "items": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value["parcels"],
            json!([{ "length": 30, "width": 20, "height": 15, "weight": 500 }])
        );
    }

    #[tokio::test]
    async fn quote_uses_request_catalog_override() {
        let body = json!({
            "items": [{ "quantity": 1, "weight_grams": 100, "length_cm": 5, "width_cm": 5, "height_cm": 5 }],
            "box_types": [{
                "name": "Cube",
                "length_cm": 8,
                "width_cm": 8,
                "height_cm": 8,
                "max_weight_grams": 1000,
                "empty_weight_grams": 50,
                "fill_ratio": 1.0
            }]
        });
        let (status, value) = send(router(test_state()), json_request("POST", "/parcels", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            value["parcels"],
            json!([{ "length": 8, "width": 8, "height": 8, "weight": 150 }])
        );
        assert_eq!(value["packages"][0]["box_type"], "Cube");
    }

    #[tokio::test]
    async fn quote_rejects_malformed_json() {
        let request = Request::builder()
            .method("POST")
            .uri("/parcels")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let (status, value) = send(router(test_state()), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["error"], "Invalid JSON data");
    }

    #[tokio::test]
    async fn quote_rejects_oversized_cart() {
        let state = ApiState::new(
            OptimizerConfig::new(PackingConfig::builder().max_units(3).build()),
            BoxCatalog::seeded(BoxType::default_catalog()),
        );
        let body = json!({ "items": [{ "quantity": 4 }] });
        let (status, value) = send(router(state), json_request("POST", "/parcels", body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["error"], "Too many units");
    }

    #[tokio::test]
    async fn box_type_crud_round_trip() {
        let state = test_state();
        let input = json!({
            "name": "Tube",
            "length_cm": 100,
            "width_cm": 10,
            "height_cm": 10,
            "max_weight_grams": 3000,
            "empty_weight_grams": 200,
            "fill_ratio": 0.9,
            "sort_order": 50
        });

        let (status, created) =
            send(router(state.clone()), json_request("POST", "/box-types", input.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().expect("id should be a string").to_string();

        // The long item now lands in the tube instead of a fallback parcel.
        let quote = json!({ "items": [{ "quantity": 1, "weight_grams": 500, "length_cm": 90, "width_cm": 8, "height_cm": 8 }] });
        let (_, value) = send(router(state.clone()), json_request("POST", "/parcels", quote)).await;
        assert_eq!(value["packages"][0]["box_type"], "Tube");

        let mut changed = input.clone();
        changed["name"] = json!("Long tube");
        let (status, updated) = send(
            router(state.clone()),
            json_request("PUT", &format!("/box-types/{}", id), changed),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Long tube");

        let (status, _) = send(
            router(state.clone()),
            Request::builder()
                .method("DELETE")
                .uri(format!("/box-types/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, listed) = send(
            router(state.clone()),
            Request::builder()
                .uri("/box-types")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = listed
            .as_array()
            .expect("list should be an array")
            .iter()
            .filter_map(|record| record["name"].as_str())
            .collect();
        assert_eq!(names, vec!["S", "M", "L", "XL"]);
    }

    #[tokio::test]
    async fn box_type_endpoints_report_unknown_ids() {
        let uri = format!("/box-types/{}", Uuid::new_v4());
        let (status, value) = send(
            router(test_state()),
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["error"], "Not found");

        let (status, _) = send(
            router(test_state()),
            Request::builder()
                .method("DELETE")
                .uri("/box-types/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_box_type_rejects_invalid_input() {
        let input = json!({
            "name": "",
            "length_cm": 10,
            "width_cm": 10,
            "height_cm": 10,
            "max_weight_grams": 1000,
            "fill_ratio": 0.5
        });
        let (status, value) =
            send(router(test_state()), json_request("POST", "/box-types", input)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["error"], "Invalid box type");
    }

    #[tokio::test]
    async fn quote_stream_emits_events() {
        let body = json!({ "items": [{ "quantity": 1, "weight_grams": 100 }] });
        let response = router(test_state())
            .oneshot(json_request("POST", "/parcels_stream", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("\"type\":\"BoxOpened\""));
        assert!(text.contains("\"type\":\"Finished\""));
    }
}
