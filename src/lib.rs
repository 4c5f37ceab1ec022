pub mod camera;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod stream;
pub mod translator;
pub mod upstream;

pub use error::{StreamError, StreamResult};
