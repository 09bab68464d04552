pub mod error;
pub mod noop;
pub mod ports;

pub use error::{ModelError, ModelErrorKind};
pub use noop::NoopModel;
pub use ports::{ModelPort, ModelRequest, ModelResponse};
