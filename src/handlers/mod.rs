pub mod common;
pub mod health;
pub mod products;
pub mod purchase_orders;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::ProductService>,
    pub replenishment: Arc<crate::services::ReplenishmentService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        default_supplier: String,
    ) -> Self {
        let products = Arc::new(crate::services::ProductService::new(
            db_pool.clone(),
            event_sender.clone(),
            default_supplier,
        ));
        let replenishment = Arc::new(crate::services::ReplenishmentService::new(
            db_pool,
            event_sender,
        ));

        Self {
            products,
            replenishment,
        }
    }
}

/// Composes the full application router over the shared state.
pub fn app_router(state: AppState) -> axum::Router {
    use utoipa::OpenApi;

    axum::Router::new()
        .merge(health::health_routes())
        .route(
            "/api/docs/openapi.json",
            axum::routing::get(|| async {
                axum::Json(crate::openapi::ApiDoc::openapi())
            }),
        )
        .nest("/api/v1/products", products::product_routes())
        .nest("/api/v1/invoices", products::invoice_routes())
        .nest(
            "/api/v1/purchase-orders",
            purchase_orders::purchase_order_routes(),
        )
        .with_state(state)
}
