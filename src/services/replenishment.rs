use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    entities::purchase_order::{
        self, Entity as PurchaseOrderEntity, PurchaseOrderStatus,
    },
    entities::purchase_order_item::{self, Entity as PurchaseOrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Condensed product view embedded in purchase order responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub stock: i32,
    pub min_stock: i32,
    pub in_stock: bool,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            stock: model.stock,
            min_stock: model.min_stock,
            in_stock: model.in_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub cost: Decimal,
    pub product: Option<ProductSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderResponse {
    pub id: Uuid,
    pub supplier: String,
    pub status: PurchaseOrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<PurchaseOrderItemResponse>,
}

/// One line of a planned supplier order, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub cost: Decimal,
}

/// A per-supplier reorder plan computed from the low-stock set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlan {
    pub supplier: String,
    pub items: Vec<PlannedItem>,
    pub total: Decimal,
}

/// Partitions the low-stock set into supplier buckets. Supplier strings are
/// used as-is (case and whitespace sensitive); blank suppliers collapse into
/// the default bucket.
pub fn group_by_supplier(products: Vec<product::Model>) -> BTreeMap<String, Vec<product::Model>> {
    let mut buckets: BTreeMap<String, Vec<product::Model>> = BTreeMap::new();
    for p in products {
        buckets
            .entry(p.supplier_bucket().to_string())
            .or_default()
            .push(p);
    }
    buckets
}

/// Computes the reorder plan for one supplier bucket. Line quantity is
/// `max(min_stock - stock, 0)`; zero-quantity lines are dropped (a guard
/// against stock changing between detection and creation). The cost snapshot
/// is the current product price, and `total = sum(cost * quantity)`. Returns
/// `None` when no line survives, so empty orders are never persisted.
pub fn plan_supplier_order(supplier: &str, products: &[product::Model]) -> Option<OrderPlan> {
    let items: Vec<PlannedItem> = products
        .iter()
        .filter_map(|p| {
            let quantity = p.reorder_quantity();
            if quantity <= 0 {
                return None;
            }
            Some(PlannedItem {
                product_id: p.id,
                quantity,
                cost: p.price,
            })
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    let total = items
        .iter()
        .fold(Decimal::ZERO, |acc, item| {
            acc + item.cost * Decimal::from(item.quantity)
        });

    Some(OrderPlan {
        supplier: supplier.to_string(),
        items,
        total,
    })
}

/// Replenishment engine: scans inventory for products below their minimum
/// stock threshold, creates one pending purchase order per supplier, and
/// reconciles received orders back into stock levels.
#[derive(Clone)]
pub struct ReplenishmentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReplenishmentService {
    /// Creates a new replenishment service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Fetches all in-stock-flagged products whose stock is below their
    /// minimum threshold. The comparison runs at the storage layer.
    #[instrument(skip(self))]
    pub async fn find_low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        let products = ProductEntity::find()
            .filter(product::Column::InStock.eq(true))
            .filter(Expr::col(product::Column::Stock).lt(Expr::col(product::Column::MinStock)))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(products)
    }

    /// Runs one replenishment pass: detects low stock, buckets by supplier,
    /// and persists one pending purchase order per supplier with eligible
    /// items. Each supplier's order commits in its own transaction; a failure
    /// for one supplier leaves already-committed orders intact.
    #[instrument(skip(self))]
    pub async fn create_purchase_orders(
        &self,
    ) -> Result<Vec<PurchaseOrderResponse>, ServiceError> {
        let low_stock = self.find_low_stock().await?;

        if low_stock.is_empty() {
            info!("replenishment pass found no products below threshold");
            return Err(ServiceError::NoReplenishmentNeeded);
        }

        for p in &low_stock {
            self.send_event(Event::LowStockDetected {
                product_id: p.id,
                stock: p.stock,
                min_stock: p.min_stock,
            })
            .await;
        }

        let buckets = group_by_supplier(low_stock);
        let mut created = Vec::with_capacity(buckets.len());

        for (supplier, products) in &buckets {
            let Some(plan) = plan_supplier_order(supplier, products) else {
                continue;
            };

            let response = self.persist_order(&plan, products).await?;
            self.send_event(Event::PurchaseOrderCreated {
                purchase_order_id: response.id,
                supplier: supplier.clone(),
                item_count: response.items.len(),
            })
            .await;
            created.push(response);
        }

        if created.is_empty() {
            // Every bucket emptied out between detection and planning.
            return Err(ServiceError::NoReplenishmentNeeded);
        }

        info!(order_count = created.len(), "replenishment pass created purchase orders");
        Ok(created)
    }

    /// Persists one supplier's order and all its line items atomically.
    async fn persist_order(
        &self,
        plan: &OrderPlan,
        products: &[product::Model],
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, supplier = %plan.supplier, "failed to start purchase order transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = purchase_order::ActiveModel {
            id: Set(order_id),
            supplier: Set(plan.supplier.clone()),
            status: Set(PurchaseOrderStatus::Pending),
            total: Set(plan.total),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let order_model = order.insert(&txn).await.map_err(|e| {
            error!(error = %e, supplier = %plan.supplier, "failed to insert purchase order");
            ServiceError::DatabaseError(e)
        })?;

        let mut item_ids = Vec::with_capacity(plan.items.len());
        let item_models: Vec<purchase_order_item::ActiveModel> = plan
            .items
            .iter()
            .map(|item| {
                let id = Uuid::new_v4();
                item_ids.push(id);
                purchase_order_item::ActiveModel {
                    id: Set(id),
                    purchase_order_id: Set(order_id),
                    product_id: Set(item.product_id),
                    quantity: Set(item.quantity),
                    cost: Set(item.cost),
                }
            })
            .collect();

        PurchaseOrderItemEntity::insert_many(item_models)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to insert purchase order items");
                ServiceError::DatabaseError(e)
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to commit purchase order transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            supplier = %plan.supplier,
            total = %plan.total,
            item_count = plan.items.len(),
            "purchase order created"
        );

        let summaries: HashMap<Uuid, ProductSummary> = products
            .iter()
            .map(|p| (p.id, ProductSummary::from(p.clone())))
            .collect();

        let items = plan
            .items
            .iter()
            .zip(item_ids)
            .map(|(item, id)| PurchaseOrderItemResponse {
                id,
                product_id: item.product_id,
                quantity: item.quantity,
                cost: item.cost,
                product: summaries.get(&item.product_id).cloned(),
            })
            .collect();

        Ok(PurchaseOrderResponse {
            id: order_model.id,
            supplier: order_model.supplier,
            status: order_model.status,
            total: order_model.total,
            created_at: order_model.created_at,
            updated_at: order_model.updated_at,
            items,
        })
    }

    /// Marks a purchase order as received and reconciles stock: within one
    /// transaction the status moves out of `pending` and every line item's
    /// product stock is incremented at the SQL layer (`stock = stock +
    /// quantity`), forcing `in_stock = true`. The status transition is a
    /// conditional write (`status = pending` filter); if no row transitions,
    /// the order was already received and the call conflicts, so the
    /// increments can never be applied twice even under concurrent receives.
    #[instrument(skip(self))]
    pub async fn receive_purchase_order(
        &self,
        order_id: Uuid,
        target_status: Option<PurchaseOrderStatus>,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let target = target_status.unwrap_or(PurchaseOrderStatus::Received);
        if target == PurchaseOrderStatus::Pending {
            // A receive that leaves the order pending would be repeatable.
            return Err(ServiceError::ValidationError(
                "Receiving must move the order out of pending".to_string(),
            ));
        }

        let mut found = PurchaseOrderEntity::find_by_id(order_id)
            .find_with_related(PurchaseOrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let items = match found.pop() {
            Some((_, items)) => items,
            None => {
                return Err(ServiceError::NotFound(format!(
                    "Purchase order {} not found",
                    order_id
                )));
            }
        };

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to start receive transaction");
            ServiceError::DatabaseError(e)
        })?;

        let transition = PurchaseOrderEntity::update_many()
            .set(purchase_order::ActiveModel {
                status: Set(target),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(purchase_order::Column::Id.eq(order_id))
            .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Pending))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "failed to update purchase order status");
                ServiceError::DatabaseError(e)
            })?;

        if transition.rows_affected == 0 {
            warn!(order_id = %order_id, "attempted to receive a non-pending purchase order");
            return Err(ServiceError::Conflict(format!(
                "Purchase order {} has already been received",
                order_id
            )));
        }

        for item in &items {
            let result = ProductEntity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).add(item.quantity),
                )
                .col_expr(product::Column::InStock, Expr::value(true))
                .filter(product::Column::Id.eq(item.product_id))
                .exec(&txn)
                .await
                .map_err(|e| {
                    error!(error = %e, product_id = %item.product_id, "failed to increment stock");
                    ServiceError::DatabaseError(e)
                })?;

            if result.rows_affected != 1 {
                // Dropping the transaction rolls back the whole receive.
                return Err(ServiceError::NotFound(format!(
                    "Product {} referenced by purchase order {} not found",
                    item.product_id, order_id
                )));
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "failed to commit receive transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(order_id = %order_id, item_count = items.len(), "purchase order received");
        self.send_event(Event::PurchaseOrderReceived(order_id)).await;

        self.get_purchase_order(order_id).await
    }

    /// Loads a single purchase order with its items and product summaries.
    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        order_id: Uuid,
    ) -> Result<PurchaseOrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let mut found = PurchaseOrderEntity::find_by_id(order_id)
            .find_with_related(PurchaseOrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        match found.pop() {
            Some((order, items)) => {
                let summaries = self.product_summaries(&items).await?;
                Ok(Self::to_response(order, items, &summaries))
            }
            None => Err(ServiceError::NotFound(format!(
                "Purchase order {} not found",
                order_id
            ))),
        }
    }

    /// Lists all purchase orders with items and product joins, newest first.
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
    ) -> Result<Vec<PurchaseOrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let orders = PurchaseOrderEntity::find()
            .order_by_desc(purchase_order::Column::CreatedAt)
            .find_with_related(PurchaseOrderItemEntity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let all_items: Vec<purchase_order_item::Model> = orders
            .iter()
            .flat_map(|(_, items)| items.iter().cloned())
            .collect();
        let summaries = self.product_summaries(&all_items).await?;

        Ok(orders
            .into_iter()
            .map(|(order, items)| Self::to_response(order, items, &summaries))
            .collect())
    }

    async fn product_summaries(
        &self,
        items: &[purchase_order_item::Model],
    ) -> Result<HashMap<Uuid, ProductSummary>, ServiceError> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &*self.db_pool;
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();

        let products = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(products
            .into_iter()
            .map(|p| (p.id, ProductSummary::from(p)))
            .collect())
    }

    fn to_response(
        order: purchase_order::Model,
        items: Vec<purchase_order_item::Model>,
        summaries: &HashMap<Uuid, ProductSummary>,
    ) -> PurchaseOrderResponse {
        let items = items
            .into_iter()
            .map(|item| PurchaseOrderItemResponse {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                cost: item.cost,
                product: summaries.get(&item.product_id).cloned(),
            })
            .collect();

        PurchaseOrderResponse {
            id: order.id,
            supplier: order.supplier,
            status: order.status,
            total: order.total,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items,
        }
    }

    async fn send_event(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send replenishment event");
            }
        }
    }
}
