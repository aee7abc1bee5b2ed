use crate::types::DbId;

/// Domain errors for the decision engine.
///
/// Every variant is a local validation or state-conflict failure. None of
/// them is transient and none should be retried automatically; transport
/// and persistence failures are reported separately by the outer layers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No restaurants in this collection to choose from!")]
    EmptyCandidateSet,

    #[error("No ballots were cast, so there is no winner")]
    NoWinner,

    #[error("No votes have been submitted yet")]
    NoVotes,

    #[error("You are not a participant in this decision")]
    NotParticipant,

    #[error("This decision is no longer accepting votes")]
    NotActive,

    #[error("This decision has already been resolved")]
    AlreadyResolved,

    #[error("Invalid rankings: {0}")]
    InvalidRankings(String),

    #[error("Only a group admin can do that")]
    NotAuthorized,

    #[error("The voting deadline for this decision has passed")]
    Expired,

    #[error("Internal error: {0}")]
    Internal(String),
}
