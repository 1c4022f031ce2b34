use std::fmt::Write;
use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::{list_routes, AppState};

/// Handler for the index page (GET /): a static listing of the available
/// query routes.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut page = String::from("<h4>Available Routes:</h4>\n");
    for route in list_routes() {
        let display = route.replace('{', "&lt;").replace('}', "&gt;");
        let _ = write!(page, "{}{}<br/>\n", state.remote_url, display);
    }
    Html(page)
}
