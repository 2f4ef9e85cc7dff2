//! Operation catalog for the Foliant portfolio agent.
//!
//! One file per operation family, each implementing the core `Operation`
//! trait against an `Arc<dyn RemoteApi>`. `default_registry` wires the
//! full catalog in its advertised order and validates the preview pairing
//! at startup.

pub mod accounts;
pub mod health;
pub mod orders;
pub mod portfolio;
pub mod symbols;
pub mod testing;
pub mod user;
mod util;
pub mod validate;

use foliant_client::RemoteApi;
use foliant_core::{Operation, OperationRegistry, RegistryError};
use std::sync::Arc;

pub use accounts::AccountsOp;
pub use health::HealthCheckOp;
pub use orders::{ImportActivitiesOp, OrdersOp, PreviewImportOp};
pub use portfolio::{DetailsOp, HoldingsOp, PerformanceOp};
pub use symbols::LookupSymbolOp;
pub use testing::StubRemote;
pub use user::UserSettingsOp;

/// Build the standard operation registry over the given remote client.
pub fn default_registry(
    client: Arc<dyn RemoteApi>,
) -> Result<OperationRegistry, RegistryError> {
    let operations: Vec<Box<dyn Operation>> = vec![
        Box::new(HealthCheckOp::new(client.clone())),
        Box::new(HoldingsOp::new(client.clone())),
        Box::new(PerformanceOp::new(client.clone())),
        Box::new(DetailsOp::new(client.clone())),
        Box::new(OrdersOp::new(client.clone())),
        Box::new(AccountsOp::new(client.clone())),
        Box::new(LookupSymbolOp::new(client.clone())),
        Box::new(UserSettingsOp::new(client.clone())),
        Box::new(PreviewImportOp),
        Box::new(ImportActivitiesOp::new(client)),
    ];
    OperationRegistry::new(operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_exposes_full_catalog() {
        let registry = default_registry(Arc::new(StubRemote::new())).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "health_check",
                "get_portfolio_holdings",
                "get_portfolio_performance",
                "get_portfolio_details",
                "get_orders",
                "get_accounts",
                "lookup_symbol",
                "get_user_settings",
                "preview_import",
                "import_activities",
            ]
        );
    }

    #[test]
    fn only_import_is_mutating() {
        let registry = default_registry(Arc::new(StubRemote::new())).unwrap();
        let mutating: Vec<String> = registry
            .descriptors()
            .into_iter()
            .filter(|d| d.mutating)
            .map(|d| d.name)
            .collect();
        assert_eq!(mutating, vec!["import_activities"]);
    }
}
