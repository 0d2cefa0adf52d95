use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by services after their transactions commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductStockAdjusted {
        product_id: Uuid,
        delta: i32,
    },
    LowStockDetected {
        product_id: Uuid,
        stock: i32,
        min_stock: i32,
    },
    PurchaseOrderCreated {
        purchase_order_id: Uuid,
        supplier: String,
        item_count: usize,
    },
    PurchaseOrderReceived(Uuid),
    InvoiceIngested {
        products_created: usize,
        products_restocked: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Background processor draining the event channel. Events are observational
/// here; external consumers (notification fan-out, analytics) hang off this
/// loop in deployment.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::LowStockDetected {
                product_id,
                stock,
                min_stock,
            } => {
                warn!(%product_id, stock, min_stock, "product below minimum stock threshold");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }
    info!("event channel closed; processor exiting");
}
