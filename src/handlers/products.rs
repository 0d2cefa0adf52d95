use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::products::{CreateProductRequest, IngestInvoiceRequest, UpdateProductRequest},
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a new catalog product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request")
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .create_product(payload)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %product.id, "product created");

    Ok(created_response(product))
}

/// List products with pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Products fetched")
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .products
        .list_products(params.page, params.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// List products currently below their minimum stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low-stock products fetched")
    ),
    tag = "products"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .replenishment
        .find_low_stock()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product fetched"),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product updated"),
        (status = 400, description = "Invalid or empty patch"),
        (status = 404, description = "Product not found")
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .products
        .update_product(product_id, payload)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %product_id, "product updated");

    Ok(success_response(product))
}

/// Apply extracted invoice line items to the catalog
#[utoipa::path(
    post,
    path = "/api/v1/invoices/ingest",
    request_body = IngestInvoiceRequest,
    responses(
        (status = 200, description = "Invoice applied to catalog"),
        (status = 400, description = "Invalid line items")
    ),
    tag = "invoices"
)]
pub async fn ingest_invoice(
    State(state): State<AppState>,
    Json(payload): Json<IngestInvoiceRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let summary = state
        .services
        .products
        .ingest_invoice(payload)
        .await
        .map_err(map_service_error)?;

    info!(
        products_created = summary.products_created,
        products_restocked = summary.products_restocked,
        "invoice ingested"
    );

    Ok(success_response(summary))
}

/// Creates the router for product endpoints
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/low-stock", get(list_low_stock))
        .route("/:id", get(get_product))
        .route("/:id", put(update_product))
}

/// Creates the router for invoice ingestion endpoints
pub fn invoice_routes() -> Router<AppState> {
    Router::new().route("/ingest", post(ingest_invoice))
}
