//! Read-only REST API over a fixed two-table climate observation dataset.
//!
//! The query core lives in [`service`] and [`db`]; everything else is
//! routing, configuration, and logging glue.

pub mod db;
pub mod routes;
mod service;
mod startup;
mod utils;

pub use db::*;
pub use routes::*;
pub use service::*;
pub use startup::*;
pub use utils::*;
