// # tentacool-api
//
// HTTP surface for tentacool.
//
// ## Endpoints
//
// ```text
// GET    /addresses            list declared addresses
// POST   /addresses            create an address (id optional)
// GET    /addresses/:id        one address
// PUT    /addresses/:id        replace a declared address, 404 if absent
// DELETE /addresses/:id        delete an address
// GET    /dhcp                 DHCP client state
// POST   /dhcp                 set DHCP client state
// GET    /dns                  resolver configuration
// POST   /dns                  set resolver configuration
// GET    /routes/gateway       default route
// POST   /routes/gateway       set default route
// GET    /interfaces           live interfaces
// GET    /interfaces/:iface    live addresses of one interface
// GET    /routes               live routing table
// ```
//
// ## Status Codes
//
// | Outcome                        | Status |
// |--------------------------------|--------|
// | Applied                        | 200 (201 on create) |
// | Stored, apply failed           | 202    |
// | Validation / bad body          | 400    |
// | Unknown id or interface        | 404    |
// | Duplicate id                   | 409    |
// | Store failure                  | 500    |
// | Apply failed, nothing stored   | 502    |

pub mod error;
pub mod routes;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{BindAddr, Listener, serve};

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tentacool_core::{NetworkInspector, Reconcilers};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub reconcilers: Reconcilers,
    pub inspector: Arc<dyn NetworkInspector>,
}

impl AppState {
    pub fn new(reconcilers: Reconcilers, inspector: Arc<dyn NetworkInspector>) -> Self {
        Self {
            reconcilers,
            inspector,
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
