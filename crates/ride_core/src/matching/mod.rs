pub mod proximity;
pub mod types;

pub use proximity::{MatcherConfig, ProximityMatcher};
pub use types::{
    CandidateRouteFailure, MatchError, MatchOutcome, MatchQuery, MatchedRide, DEFAULT_TOLERANCE_M,
};
