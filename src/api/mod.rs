pub mod error;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use sessions::SessionStore;
pub use state::AppState;
