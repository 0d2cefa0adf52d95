use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Bucket used when a product carries no supplier of its own. Normalization
/// happens once, at catalog entry / invoice ingestion; the replenishment
/// grouping applies the same fallback defensively for older rows.
pub const DEFAULT_SUPPLIER: &str = "Default Supplier";

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// SKU (Stock Keeping Unit)
    #[validate(length(
        min = 1,
        max = 100,
        message = "SKU must be between 1 and 100 characters"
    ))]
    #[sea_orm(unique)]
    pub sku: String,

    /// Product description
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// Retail (wholesale customer facing) price
    pub price: Decimal,

    /// Acquisition cost basis
    pub cost: Decimal,

    /// Units currently on hand
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,

    /// Minimum stock threshold that triggers replenishment
    #[validate(range(min = 0, message = "Minimum stock cannot be negative"))]
    pub min_stock: i32,

    /// Supplier bucket used for purchase-order grouping
    #[validate(length(
        min = 1,
        max = 255,
        message = "Supplier must be between 1 and 255 characters"
    ))]
    pub supplier: String,

    /// Whether the product is considered stocked/sellable
    pub in_stock: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Gap between the minimum threshold and current stock, floored at zero.
    pub fn reorder_quantity(&self) -> i32 {
        (self.min_stock - self.stock).max(0)
    }

    /// Supplier bucket, falling back to [`DEFAULT_SUPPLIER`] for rows that
    /// predate ingestion-time normalization.
    pub fn supplier_bucket(&self) -> &str {
        if self.supplier.trim().is_empty() {
            DEFAULT_SUPPLIER
        } else {
            &self.supplier
        }
    }
}

/// Product entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    PurchaseOrderItems,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.in_stock {
                active_model.in_stock = Set(true);
            }

            active_model.created_at = Set(Utc::now());
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
