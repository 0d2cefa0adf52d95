use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(range(min = 0))]
    pub min_stock: i32,
    /// Optional; blank or missing collapses to the configured default supplier
    pub supplier: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    #[validate(range(min = 0))]
    pub min_stock: Option<i32>,
    pub supplier: Option<String>,
    pub in_stock: Option<bool>,
}

impl UpdateProductRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.cost.is_none()
            && self.min_stock.is_none()
            && self.supplier.is_none()
            && self.in_stock.is_none()
    }
}

/// One extracted invoice line from the external AI ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InvoiceLine {
    #[validate(length(min = 1, max = 255, message = "Line item name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestInvoiceRequest {
    #[validate(length(min = 1, message = "Invoice must contain at least one line item"))]
    pub items: Vec<InvoiceLine>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestInvoiceResponse {
    pub products_created: usize,
    pub products_restocked: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing the product catalog and applying ingested invoices.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    default_supplier: String,
}

impl ProductService {
    /// Creates a new product service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        default_supplier: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_supplier,
        }
    }

    /// The single supplier-normalization point: blank or missing supplier
    /// strings collapse to the configured default bucket.
    fn normalize_supplier(&self, supplier: Option<String>) -> String {
        match supplier {
            Some(s) if !s.trim().is_empty() => s,
            _ => self.default_supplier.clone(),
        }
    }

    /// Creates a new catalog product.
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let product_id = Uuid::new_v4();
        let supplier = self.normalize_supplier(request.supplier);

        let active_model = product::ActiveModel {
            id: Set(product_id),
            name: Set(request.name),
            sku: Set(request.sku),
            description: Set(request.description),
            price: Set(request.price),
            cost: Set(request.cost),
            stock: Set(request.stock),
            min_stock: Set(request.min_stock),
            supplier: Set(supplier),
            ..Default::default()
        };

        let model = active_model.insert(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %product_id, sku = %model.sku, "product created");
        self.send_event(Event::ProductCreated(product_id)).await;

        Ok(model)
    }

    /// Retrieves a product by ID.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        ProductEntity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Lists products with pagination, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db_pool;

        let paginator = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Applies a patch to a product. A patch carrying no fields at all is a
    /// validation failure.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if request.is_empty() {
            return Err(ServiceError::ValidationError(
                "No fields to update".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let existing = self.get_product(product_id).await?;
        let mut active_model = existing.into_active_model();

        if let Some(name) = request.name {
            active_model.name = Set(name);
        }
        if let Some(description) = request.description {
            active_model.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active_model.price = Set(price);
        }
        if let Some(cost) = request.cost {
            active_model.cost = Set(cost);
        }
        if let Some(min_stock) = request.min_stock {
            active_model.min_stock = Set(min_stock);
        }
        if let Some(supplier) = request.supplier {
            active_model.supplier = Set(self.normalize_supplier(Some(supplier)));
        }
        if let Some(in_stock) = request.in_stock {
            active_model.in_stock = Set(in_stock);
        }

        let model = active_model.update(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "failed to update product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %product_id, "product updated");
        self.send_event(Event::ProductUpdated(product_id)).await;

        Ok(model)
    }

    /// Applies the extracted line items of one supplier invoice to the
    /// catalog in a single transaction. Lines matching an existing product by
    /// name increment its stock at the SQL layer and refresh its cost basis;
    /// unknown lines create new products.
    #[instrument(skip(self, request), fields(line_count = request.items.len()))]
    pub async fn ingest_invoice(
        &self,
        request: IngestInvoiceRequest,
    ) -> Result<IngestInvoiceResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start invoice ingestion transaction");
            ServiceError::DatabaseError(e)
        })?;

        let mut products_created = 0usize;
        let mut products_restocked = 0usize;
        let mut adjustments: Vec<(Uuid, i32)> = Vec::new();
        let mut created_ids: Vec<Uuid> = Vec::new();

        for line in &request.items {
            line.validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

            let existing = ProductEntity::find()
                .filter(product::Column::Name.eq(line.name.as_str()))
                .one(&txn)
                .await
                .map_err(ServiceError::DatabaseError)?;

            match existing {
                Some(found) => {
                    ProductEntity::update_many()
                        .col_expr(
                            product::Column::Stock,
                            Expr::col(product::Column::Stock).add(line.quantity),
                        )
                        .col_expr(product::Column::InStock, Expr::value(true))
                        .col_expr(product::Column::Cost, Expr::value(line.unit_cost))
                        .filter(product::Column::Id.eq(found.id))
                        .exec(&txn)
                        .await
                        .map_err(|e| {
                            error!(error = %e, product_id = %found.id, "failed to restock product");
                            ServiceError::DatabaseError(e)
                        })?;

                    adjustments.push((found.id, line.quantity));
                    products_restocked += 1;
                }
                None => {
                    let product_id = Uuid::new_v4();
                    let active_model = product::ActiveModel {
                        id: Set(product_id),
                        name: Set(line.name.clone()),
                        sku: Set(generate_sku(&line.name)),
                        description: Set(None),
                        price: Set(line.unit_cost),
                        cost: Set(line.unit_cost),
                        stock: Set(line.quantity),
                        min_stock: Set(0),
                        supplier: Set(self.default_supplier.clone()),
                        in_stock: Set(true),
                        ..Default::default()
                    };

                    active_model.insert(&txn).await.map_err(|e| {
                        error!(error = %e, name = %line.name, "failed to create product from invoice line");
                        ServiceError::DatabaseError(e)
                    })?;

                    created_ids.push(product_id);
                    products_created += 1;
                }
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "failed to commit invoice ingestion transaction");
            ServiceError::DatabaseError(e)
        })?;

        for (product_id, delta) in adjustments {
            self.send_event(Event::ProductStockAdjusted { product_id, delta })
                .await;
        }
        for product_id in created_ids {
            self.send_event(Event::ProductCreated(product_id)).await;
        }
        self.send_event(Event::InvoiceIngested {
            products_created,
            products_restocked,
        })
        .await;

        info!(
            products_created,
            products_restocked, "invoice ingestion applied"
        );

        Ok(IngestInvoiceResponse {
            products_created,
            products_restocked,
        })
    }

    async fn send_event(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send catalog event");
            }
        }
    }
}

/// Derives a SKU from an invoice line name: uppercased alphanumeric slug plus
/// a short random suffix to keep the column unique.
fn generate_sku(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let suffix = Uuid::new_v4().simple().to_string();
    let slug = if slug.is_empty() { "ITEM".to_string() } else { slug };
    format!("{}-{}", &slug[..slug.len().min(80)], &suffix[..8])
}
