use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Handle used by services to publish domain events onto the in-process bus.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the bus is gone.
    /// Event delivery is best-effort; business writes never depend on it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account directory events
    UserCreated(Uuid),
    UserStatusToggled {
        user_id: Uuid,
        is_enabled: bool,
    },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductRestocked {
        product_id: Uuid,
        quantity_added: Decimal,
        stock_after: Decimal,
    },

    // Cart events
    CartItemAdded {
        user_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        user_id: Uuid,
        product_id: Uuid,
    },

    // Order ledger events
    OrderCompleted(Uuid),
    CheckoutCompleted {
        user_id: Uuid,
        order_id: Uuid,
    },

    // Attendance events
    AttendanceRecorded {
        user_id: Uuid,
        date: NaiveDate,
    },
}

// Function to process incoming events and distribute them to interested handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCompleted(order_id) => {
                if let Err(e) = handle_order_completed(order_id).await {
                    error!(
                        "Failed to handle order completed event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::ProductRestocked {
                product_id,
                quantity_added,
                stock_after,
            } => {
                info!(
                    "Product {} restocked by {} (now {})",
                    product_id, quantity_added, stock_after
                );
                if is_low_stock(stock_after) {
                    warn!(
                        "Low stock alert: product {} still has only {} units after restock",
                        product_id, stock_after
                    );
                }
            }
            Event::CheckoutCompleted { user_id, order_id } => {
                info!("Checkout completed: user {} order {}", user_id, order_id);
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}

async fn handle_order_completed(order_id: Uuid) -> Result<(), String> {
    info!("Processing completed order {}", order_id);
    Ok(())
}

/// Threshold below which the bus flags a product as running low.
pub fn is_low_stock(stock: Decimal) -> bool {
    stock < dec!(10)
}
