pub mod http;

pub use http::HttpReducer;
