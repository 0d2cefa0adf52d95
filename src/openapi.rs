use utoipa::OpenApi;

/// Aggregated OpenAPI document for the HTTP surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::list_low_stock,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::ingest_invoice,
        crate::handlers::purchase_orders::replenish,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::receive_purchase_order,
    ),
    components(schemas(
        crate::entities::purchase_order::PurchaseOrderStatus,
        crate::errors::ErrorResponse,
        crate::handlers::health::HealthResponse,
        crate::handlers::purchase_orders::ReceivePurchaseOrderRequest,
        crate::services::products::CreateProductRequest,
        crate::services::products::UpdateProductRequest,
        crate::services::products::InvoiceLine,
        crate::services::products::IngestInvoiceRequest,
        crate::services::products::IngestInvoiceResponse,
        crate::services::replenishment::ProductSummary,
        crate::services::replenishment::PurchaseOrderItemResponse,
        crate::services::replenishment::PurchaseOrderResponse,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "invoices", description = "Invoice ingestion"),
        (name = "purchase-orders", description = "Replenishment and receiving"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "wholesale-api",
        description = "Back-office API for wholesale distribution"
    )
)]
pub struct ApiDoc;
