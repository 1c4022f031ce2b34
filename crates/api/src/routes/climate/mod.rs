pub mod api_routes;

pub use api_routes::*;
