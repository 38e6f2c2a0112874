//! Domain layer - core business logic and entities

pub mod ledger;
pub mod routing;
