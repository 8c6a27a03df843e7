use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid rank: {0}")]
    InvalidRank(char),

    #[error("Invalid suit: {0}")]
    InvalidSuit(char),

    #[error("Invalid card notation: {0}")]
    InvalidCardNotation(String),

    #[error("Invalid board notation: {0}")]
    InvalidBoardNotation(String),

    #[error("Duplicate card: {0}")]
    DuplicateCard(String),

    #[error("Need at least {need} cards, got {got}")]
    NotEnoughCards { need: usize, got: usize },

    #[error("Invalid range notation: {0}")]
    InvalidRangeNotation(String),

    #[error("Hand {0} appears more than once in the range")]
    DuplicateCombo(String),

    #[error("Range is not evenly weighted")]
    UnevenWeighting,

    #[error("{0}")]
    Validation(String),

    #[error("Combo {combo} is not in any branch of the tree")]
    InvalidComboForTree { combo: String },

    #[error("Incompatible ranges: {0}")]
    IncompatibleRanges(String),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors caused by user input that the caller can report and recover from.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidRank(_)
                | EngineError::InvalidSuit(_)
                | EngineError::InvalidCardNotation(_)
                | EngineError::InvalidBoardNotation(_)
                | EngineError::DuplicateCard(_)
                | EngineError::InvalidRangeNotation(_)
                | EngineError::DuplicateCombo(_)
                | EngineError::UnevenWeighting
                | EngineError::Validation(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
