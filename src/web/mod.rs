//! HTTP API for the file sharing service.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::AppState;
pub use middleware::{AuthUser, JwtClaims, JwtState};
pub use router::{create_health_router, create_router, create_uploads_router};
pub use server::WebServer;
