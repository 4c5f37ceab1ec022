pub mod envelope;
pub mod http;
pub mod routes;

pub use http::{build_app, start_server};
pub use routes::{create_router, AppState};
