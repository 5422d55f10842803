pub mod station_ctx;
pub mod station_flow;

pub use station_ctx::CandidateCtx;
pub use station_flow::{CandidateOutcome, StationFlow};
