//! Back-office API for wholesale distribution.
//!
//! The core of the service is the replenishment engine
//! ([`services::ReplenishmentService`]): it scans the catalog for products
//! below their minimum stock threshold, creates one pending purchase order
//! per supplier, and reconciles received orders back into stock levels in a
//! single transaction. Around it sit the product catalog and the invoice
//! ingestion endpoint that applies externally-extracted invoice line items.

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}
