//! Shared error taxonomy for the fleet workspace.

pub mod error;

pub use error::FleetError;
