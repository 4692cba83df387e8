//! # Robridge Web
//!
//! axum surface over [`robridge_core::ProxyService`].
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /api/fetch?url=&mode=` | Generic pass-through |
//! | `GET /api/items/:user_id` | Aggregated items of a user |
//! | `GET /games/:user_id` | Public games of a user |
//! | `GET /gamepasses/:universe_id` | Open Cloud game passes of a universe |
//! | `GET /avatar/:user_id` | Saved outfits of a user |
//! | `GET /api/avatar?endpoint=` | Authenticated forward to the first-party host |
//! | `GET /api/gamepasses?universeId=` | Creator listing of a universe's passes |
//! | `GET /health` | Liveness and cache counters |
//!
//! Successful responses carry `Cache-Control` and `x-cache: HIT|MISS`.
//! Errors are JSON bodies described in [`error`].

pub mod cli;
pub mod error;
pub mod extract;
pub mod observability;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
