//! Terminal-multiplexer driver for the fleet.
//!
//! The scanner only needs three operations (list sessions, capture a pane
//! tail, read a session environment variable), so they live behind the
//! [`TmuxClient`] trait and tests substitute mocks.

pub mod driver;
pub mod registry;

pub use driver::{TmuxClient, TmuxDriver};
pub use registry::PrefixRegistry;
