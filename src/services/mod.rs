pub mod attendance;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod reports;
pub mod users;

use crate::{
    db::DbPool,
    entities::user::{Capability, Model as UserModel},
    errors::ServiceError,
    events::EventSender,
};
use std::sync::Arc;

/// Services layer that encapsulates the back-office business logic.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<users::UserService>,
    pub catalog: Arc<catalog::ProductCatalogService>,
    pub cart: Arc<cart::CartService>,
    pub checkout: Arc<checkout::CheckoutService>,
    pub attendance: Arc<attendance::AttendanceService>,
    pub reports: Arc<reports::ReportService>,
}

impl AppServices {
    /// Build the service container over a shared pool and event bus.
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let users = Arc::new(users::UserService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let catalog = Arc::new(catalog::ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(cart::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(checkout::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let attendance = Arc::new(attendance::AttendanceService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let reports = Arc::new(reports::ReportService::new(db_pool));

        Self {
            users,
            catalog,
            cart,
            checkout,
            attendance,
            reports,
        }
    }
}

/// Rejects disabled actors. All service operations run behind this gate:
/// disabling an account locks it out of use, not just login.
pub(crate) fn ensure_enabled(actor: &UserModel) -> Result<(), ServiceError> {
    if actor.is_enabled {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Account is disabled".to_string()))
    }
}

/// Fails with `Forbidden` unless the actor is enabled and their role
/// grants the capability.
pub(crate) fn authorize(actor: &UserModel, capability: Capability) -> Result<(), ServiceError> {
    ensure_enabled(actor)?;
    if actor.can(capability) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "Role {} does not grant {}",
            actor.role, capability
        )))
    }
}
