//! Stored history of a finished hand, as handed over by the persistence layer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Combo};
use crate::error::{EngineError, EngineResult};
use crate::game::{default_factor, ActionResult, GameState, PlayerId, Seat};
use crate::range::HandRange;
use crate::resolution::ActionRangeTriple;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatSetup {
    /// Stack before blinds and antes are posted.
    pub stack: u64,
    #[serde(default)]
    pub blind: u64,
    #[serde(default)]
    pub ante: u64,
    pub range: HandRange,
    #[serde(default)]
    pub holding: Option<Combo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryRow {
    /// New community cards.
    Board { cards: Vec<Card> },
    /// The range split a player declared.
    Ranges {
        player: PlayerId,
        triple: ActionRangeTriple,
    },
    /// What that declaration resolved to.
    Action {
        player: PlayerId,
        action: ActionResult,
    },
    Showdown {
        #[serde(default)]
        hands: Vec<(PlayerId, Combo)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandHistory {
    /// Seats in postflop action order.
    pub seats: Vec<SeatSetup>,
    pub big_blind: u64,
    pub preflop_first: PlayerId,
    /// Weight of this hand's line among its spawned siblings.
    #[serde(default = "default_factor")]
    pub current_factor: f64,
    #[serde(default)]
    pub rows: Vec<HistoryRow>,
}

impl HandHistory {
    pub fn from_json_file(path: &Path) -> EngineResult<HandHistory> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Table state once blinds and antes are in.
    pub fn initial_state(&self) -> EngineResult<GameState> {
        let mut seats = Vec::with_capacity(self.seats.len());
        for (player, setup) in self.seats.iter().enumerate() {
            let posted = setup.blind + setup.ante;
            if posted > setup.stack {
                return Err(EngineError::Validation(format!(
                    "player {} cannot post {} from a stack of {}",
                    player, posted, setup.stack
                )));
            }
            let mut seat = Seat::new(setup.stack - posted, setup.range.clone());
            seat.street_contribution = setup.blind;
            seat.total_contribution = posted;
            seat.holding = setup.holding;
            seats.push(seat);
        }
        let mut state = GameState::new(seats, self.big_blind, self.preflop_first)?;
        state.current_factor = self.current_factor;
        Ok(state)
    }
}
