pub mod adapters;
pub mod binding;
pub mod client;
pub mod error;
pub mod noop;
pub mod ports;
pub mod types;

pub use binding::ReducerBinding;
pub use client::ReductionClient;
pub use error::{ReductionError, ReductionErrorKind};
pub use noop::NoopReducer;
pub use ports::ReducerPort;
pub use types::{
    FallbackReason, GroundingResult, ReduceRequest, ReducedIntent, ReductionOutcome,
    ReducerResponse,
};
