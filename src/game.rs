//! Betting state of one hand: seats, contributions, who still owes an action.
//!
//! Seats are indexed by `PlayerId` and listed in postflop action order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{cards_mask, format_cards, Card, Combo};
use crate::error::{EngineError, EngineResult};
use crate::range::HandRange;

pub type PlayerId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub fn from_board_len(len: usize) -> EngineResult<Street> {
        match len {
            0 => Ok(Street::Preflop),
            3 => Ok(Street::Flop),
            4 => Ok(Street::Turn),
            5 => Ok(Street::River),
            _ => Err(EngineError::InvalidBoardNotation(format!(
                "a board cannot have {} cards",
                len
            ))),
        }
    }

    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Preflop => write!(f, "preflop"),
            Street::Flop => write!(f, "flop"),
            Street::Turn => write!(f, "turn"),
            Street::River => write!(f, "river"),
        }
    }
}

/// The concrete action realized at a decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum ActionResult {
    Fold,
    Call,
    RaiseTo(u64),
    /// Every remaining line ends the hand; nothing concrete was realized.
    Terminate,
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Fold => write!(f, "fold"),
            ActionResult::Call => write!(f, "call"),
            ActionResult::RaiseTo(total) => write!(f, "raise to {}", total),
            ActionResult::Terminate => write!(f, "terminate"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    /// Chips behind.
    pub stack: u64,
    #[serde(default)]
    pub street_contribution: u64,
    #[serde(default)]
    pub total_contribution: u64,
    #[serde(default)]
    pub folded: bool,
    pub range: HandRange,
    /// Concealed hole cards, once dealt.
    #[serde(default)]
    pub holding: Option<Combo>,
    #[serde(default)]
    pub owes_action: bool,
}

impl Seat {
    pub fn new(stack: u64, range: HandRange) -> Seat {
        Seat {
            stack,
            street_contribution: 0,
            total_contribution: 0,
            folded: false,
            range,
            holding: None,
            owes_action: false,
        }
    }

    /// Moves chips from the stack into the pot.
    fn put_in(&mut self, amount: u64) {
        self.stack -= amount;
        self.street_contribution += amount;
        self.total_contribution += amount;
    }

    fn can_act(&self) -> bool {
        !self.folded && self.stack > 0
    }
}

/// What the player to act may legally do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOptions {
    pub call_cost: u64,
    pub can_raise: bool,
    /// Smallest legal raise, as a total street contribution.
    pub min_raise: u64,
    /// Largest legal raise (all-in), as a total street contribution.
    pub max_raise: u64,
    /// A bet is already in front of the player this street.
    pub facing_bet: bool,
}

impl ActionOptions {
    pub fn passive_label(&self) -> &'static str {
        if self.call_cost == 0 {
            "check"
        } else {
            "call"
        }
    }

    pub fn aggressive_label(&self) -> &'static str {
        if self.facing_bet {
            "raise"
        } else {
            "bet"
        }
    }
}

pub(crate) fn default_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub board: Vec<Card>,
    pub big_blind: u64,
    /// Size of the last full raise increment this street.
    pub last_raise: u64,
    pub to_act: Option<PlayerId>,
    /// Cumulative weight of this line among its spawned siblings.
    #[serde(default = "default_factor")]
    pub current_factor: f64,
}

impl GameState {
    /// Starts a hand from seats whose blinds and antes are already posted.
    pub fn new(mut seats: Vec<Seat>, big_blind: u64, preflop_first: PlayerId) -> EngineResult<GameState> {
        if seats.len() < 2 {
            return Err(EngineError::Validation(
                "a hand needs at least two seats".to_string(),
            ));
        }
        if preflop_first >= seats.len() {
            return Err(EngineError::Validation(format!(
                "seat {} does not exist",
                preflop_first
            )));
        }
        let live = seats.iter().filter(|s| s.can_act()).count();
        for seat in seats.iter_mut() {
            seat.owes_action = live >= 2 && seat.can_act();
        }
        let mut state = GameState {
            seats,
            board: Vec::new(),
            big_blind,
            last_raise: big_blind,
            to_act: None,
            current_factor: 1.0,
        };
        state.to_act = state.next_owing_from(preflop_first);
        Ok(state)
    }

    pub fn street(&self) -> Street {
        Street::from_board_len(self.board.len()).unwrap_or(Street::River)
    }

    pub fn pot(&self) -> u64 {
        self.seats.iter().map(|s| s.total_contribution).sum()
    }

    pub fn highest_contribution(&self) -> u64 {
        self.seats
            .iter()
            .map(|s| s.street_contribution)
            .max()
            .unwrap_or(0)
    }

    pub fn unfolded(&self) -> Vec<PlayerId> {
        (0..self.seats.len())
            .filter(|&p| !self.seats[p].folded)
            .collect()
    }

    pub fn unfolded_count(&self) -> usize {
        self.seats.iter().filter(|s| !s.folded).count()
    }

    pub fn owing_count(&self) -> usize {
        self.seats.iter().filter(|s| s.owes_action).count()
    }

    /// Some live player has no chips behind.
    pub fn anyone_all_in(&self) -> bool {
        self.seats.iter().any(|s| !s.folded && s.stack == 0)
    }

    pub fn is_action_closed(&self) -> bool {
        self.owing_count() == 0
    }

    pub fn is_hand_over(&self) -> bool {
        self.unfolded_count() <= 1 || (self.street() == Street::River && self.is_action_closed())
    }

    /// Cards nobody else may be dealt: the board plus other players' fixed holdings.
    pub fn dead_cards_for(&self, actor: PlayerId) -> u64 {
        cards_mask(&self.board) | self.holdings_except(actor)
    }

    pub fn holdings_except(&self, actor: PlayerId) -> u64 {
        self.seats
            .iter()
            .enumerate()
            .filter(|&(p, _)| p != actor)
            .filter_map(|(_, s)| s.holding)
            .fold(0u64, |acc, c| acc | c.mask())
    }

    fn seat(&self, player: PlayerId) -> EngineResult<&Seat> {
        self.seats
            .get(player)
            .ok_or_else(|| EngineError::Validation(format!("seat {} does not exist", player)))
    }

    fn next_owing_from(&self, start: PlayerId) -> Option<PlayerId> {
        let n = self.seats.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&p| self.seats[p].owes_action)
    }

    pub fn current_options(&self, actor: PlayerId) -> EngineResult<ActionOptions> {
        let seat = self.seat(actor)?;
        let highest = self.highest_contribution();
        let to_call = highest.saturating_sub(seat.street_contribution);
        let call_cost = to_call.min(seat.stack);
        let max_raise = seat.street_contribution + seat.stack;
        let min_raise = (highest + self.last_raise.max(self.big_blind)).min(max_raise);
        let others_can_respond = self
            .seats
            .iter()
            .enumerate()
            .any(|(p, s)| p != actor && s.can_act());
        Ok(ActionOptions {
            call_cost,
            can_raise: seat.stack > to_call && others_can_respond,
            min_raise,
            max_raise,
            facing_bet: highest > 0,
        })
    }

    /// Applies a realized action and moves the turn along.
    pub fn apply(&mut self, actor: PlayerId, action: &ActionResult) -> EngineResult<()> {
        self.seat(actor)?;
        if self.seats[actor].folded {
            return Err(EngineError::Validation(format!(
                "player {} has already folded",
                actor
            )));
        }
        match *action {
            ActionResult::Fold => {
                self.seats[actor].folded = true;
            }
            ActionResult::Call => {
                let highest = self.highest_contribution();
                let seat = &mut self.seats[actor];
                let pay = highest.saturating_sub(seat.street_contribution).min(seat.stack);
                seat.put_in(pay);
            }
            ActionResult::RaiseTo(total) => {
                let highest = self.highest_contribution();
                let seat = &self.seats[actor];
                if total <= highest || total > seat.street_contribution + seat.stack {
                    return Err(EngineError::Validation(format!(
                        "cannot raise to {} (facing {}, all-in at {})",
                        total,
                        highest,
                        seat.street_contribution + seat.stack
                    )));
                }
                let amount = total - seat.street_contribution;
                self.last_raise = self.last_raise.max(total - highest);
                self.seats[actor].put_in(amount);
                for (p, other) in self.seats.iter_mut().enumerate() {
                    if p != actor && other.can_act() {
                        other.owes_action = true;
                    }
                }
            }
            ActionResult::Terminate => {
                for seat in self.seats.iter_mut() {
                    seat.owes_action = false;
                }
                self.to_act = None;
                return Ok(());
            }
        }
        self.seats[actor].owes_action = false;

        if self.unfolded_count() <= 1 {
            for seat in self.seats.iter_mut() {
                seat.owes_action = false;
            }
        } else if self.seats.iter().filter(|s| s.can_act()).count() == 1 {
            // A lone player with chips behind only acts while facing a bet.
            let highest = self.highest_contribution();
            for seat in self.seats.iter_mut() {
                if seat.can_act() && seat.street_contribution >= highest {
                    seat.owes_action = false;
                }
            }
        }
        self.to_act = self.next_owing_from(actor + 1);
        Ok(())
    }

    /// Whether the hand still has decisions to make after `actor` takes `action`.
    ///
    /// On the river, or once someone is all-in, the hand goes on only while two
    /// players remain and one of them still owes an action. Earlier and with
    /// chips behind everywhere, two remaining players are enough.
    pub fn branch_continues(&self, actor: PlayerId, action: &ActionResult) -> bool {
        let mut next = self.clone();
        if next.apply(actor, action).is_err() {
            return false;
        }
        let remaining = next.unfolded_count();
        if self.street() == Street::River || self.anyone_all_in() {
            remaining >= 2 && next.owing_count() > 0
        } else {
            remaining >= 2
        }
    }

    /// Deals the next street's cards and reopens the betting.
    pub fn advance_street(&mut self, cards: &[Card]) -> EngineResult<()> {
        let mut board = self.board.clone();
        board.extend_from_slice(cards);
        Street::from_board_len(board.len())?;
        if cards_mask(&board).count_ones() as usize != board.len() {
            return Err(EngineError::DuplicateCard(format_cards(&board)));
        }
        let held = self
            .seats
            .iter()
            .filter_map(|s| s.holding)
            .fold(0u64, |acc, c| acc | c.mask());
        if held & cards_mask(cards) != 0 {
            return Err(EngineError::DuplicateCard(format_cards(cards)));
        }

        self.board = board;
        self.last_raise = self.big_blind;
        let live = self.seats.iter().filter(|s| s.can_act()).count();
        for seat in self.seats.iter_mut() {
            seat.street_contribution = 0;
            seat.owes_action = live >= 2 && seat.can_act();
        }
        self.to_act = self.next_owing_from(0);
        Ok(())
    }
}

/// Legal options for `actor` in `state`.
pub fn current_options(state: &GameState, actor: PlayerId) -> EngineResult<ActionOptions> {
    state.current_options(actor)
}
