//! HTTP API: `POST /validate`, `GET /health`, `GET /metrics`.

mod health;
mod metrics;
mod router;
mod validate;


pub use health::HealthResponse;
pub use router::{create_router, AppState};
pub use validate::{ValidationRequest, ValidationResponse};
