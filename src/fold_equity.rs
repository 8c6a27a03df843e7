//! Fold equity of every bet in a finished hand, per bettor holding.
//!
//! Replays the hand's rows. A bet opens an accumulator that collects the
//! range splits of everyone who could fold to it; once all of them have
//! declared, the accumulator is turned into a [`FoldEquityRecord`].

use serde::Serialize;

use crate::cards::{cards_mask, Card, Combo};
use crate::error::{EngineError, EngineResult};
use crate::game::{ActionResult, PlayerId, Street};
use crate::history::{HandHistory, HistoryRow};
use crate::range::HandRange;
use crate::resolution::ActionRangeTriple;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboFoldEquity {
    pub combo: Combo,
    /// Probability that every potential folder folds.
    pub fold_ratio: f64,
    /// Net result of the bet counting only the fold outcome.
    pub immediate_result: f64,
    /// What the bet may lose when called and still break even. Infinite when everyone always folds.
    pub semibluff_ev: f64,
    pub semibluff_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldEquityRecord {
    pub bettor: PlayerId,
    pub street: Street,
    pub raise_total: u64,
    pub pot_before_bet: u64,
    pub bet_cost: u64,
    pub cost_to_call: u64,
    pub pot_if_called: u64,
    pub folders: Vec<PlayerId>,
    pub combos: Vec<ComboFoldEquity>,
}

impl FoldEquityRecord {
    pub fn combo(&self, combo: &Combo) -> Option<&ComboFoldEquity> {
        self.combos.iter().find(|c| c.combo == *combo)
    }

    /// Unweighted mean fold ratio over the bettor's combos.
    pub fn mean_fold_ratio(&self) -> f64 {
        if self.combos.is_empty() {
            return 0.0;
        }
        self.combos.iter().map(|c| c.fold_ratio).sum::<f64>() / self.combos.len() as f64
    }
}

struct Response {
    fold: HandRange,
    continuing: [HandRange; 2],
}

impl Response {
    fn fold_ratio(&self, dead: u64) -> f64 {
        let folds = self.fold.combos_avoiding(dead).len();
        let stays: usize = self
            .continuing
            .iter()
            .map(|r| r.combos_avoiding(dead).len())
            .sum();
        if folds + stays == 0 {
            0.0
        } else {
            folds as f64 / (folds + stays) as f64
        }
    }
}

struct Accumulator {
    bettor: PlayerId,
    street: Street,
    board: Vec<Card>,
    range: HandRange,
    raise_total: u64,
    pot_before_bet: u64,
    bet_cost: u64,
    cost_to_call: u64,
    pot_if_called: u64,
    folders: Vec<PlayerId>,
    pending: Vec<PlayerId>,
    responses: Vec<Response>,
}

impl Accumulator {
    fn respond(&mut self, player: PlayerId, triple: &ActionRangeTriple) {
        self.pending.retain(|&p| p != player);
        self.responses.push(Response {
            fold: triple.fold.clone(),
            continuing: [triple.passive.clone(), triple.aggressive.clone()],
        });
    }

    fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    fn finalize(self) -> FoldEquityRecord {
        let board_mask = cards_mask(&self.board);
        let pot = self.pot_before_bet as f64;
        let bet = self.bet_cost as f64;
        let combos = self
            .range
            .generate(&self.board)
            .into_iter()
            .map(|(combo, _)| {
                let dead = combo.mask() | board_mask;
                let fold_ratio: f64 = self.responses.iter().map(|r| r.fold_ratio(dead)).product();
                let immediate_result = fold_ratio * pot - (1.0 - fold_ratio) * bet;
                let semibluff_ev = if fold_ratio >= 1.0 {
                    f64::INFINITY
                } else {
                    -immediate_result / (1.0 - fold_ratio)
                };
                let semibluff_equity = if self.pot_if_called == 0 {
                    0.0
                } else {
                    semibluff_ev / self.pot_if_called as f64
                };
                ComboFoldEquity {
                    combo,
                    fold_ratio,
                    immediate_result,
                    semibluff_ev,
                    semibluff_equity,
                }
            })
            .collect();

        FoldEquityRecord {
            bettor: self.bettor,
            street: self.street,
            raise_total: self.raise_total,
            pot_before_bet: self.pot_before_bet,
            bet_cost: self.bet_cost,
            cost_to_call: self.cost_to_call,
            pot_if_called: self.pot_if_called,
            folders: self.folders,
            combos,
        }
    }
}

fn discard(open: &mut Option<Accumulator>, reason: &str) {
    if let Some(acc) = open.take() {
        log::debug!(
            "dropping fold equity for player {}'s bet to {}: {}",
            acc.bettor,
            acc.raise_total,
            reason
        );
    }
}

/// One record per bet whose potential folders all declared a range split.
pub fn analyze_fold_equity(history: &HandHistory) -> EngineResult<Vec<FoldEquityRecord>> {
    let mut state = history.initial_state()?;
    let mut open: Option<Accumulator> = None;
    let mut declared: Option<(PlayerId, ActionRangeTriple)> = None;
    let mut records = Vec::new();

    for row in &history.rows {
        match row {
            HistoryRow::Board { cards } => {
                discard(&mut open, "street ended");
                state.advance_street(cards)?;
            }
            HistoryRow::Ranges { player, triple } => {
                if let Some(acc) = open.as_mut() {
                    if acc.pending.contains(player) {
                        acc.respond(*player, triple);
                    }
                }
                if open.as_ref().map_or(false, Accumulator::is_complete) {
                    if let Some(acc) = open.take() {
                        records.push(acc.finalize());
                    }
                }
                declared = Some((*player, triple.clone()));
            }
            HistoryRow::Action { player, action } => {
                let player = *player;
                if player >= state.seats.len() {
                    return Err(EngineError::Validation(format!(
                        "seat {} does not exist",
                        player
                    )));
                }
                if *action == ActionResult::Terminate {
                    discard(&mut open, "hand terminated");
                    break;
                }
                let before = state.seats[player].range.clone();
                if let Some((p, triple)) = declared.take() {
                    if p == player {
                        if let Some(range) = triple.range_for(action) {
                            state.seats[player].range = range.clone();
                        }
                    }
                }

                if let ActionResult::RaiseTo(total) = *action {
                    let pot_before_bet = state.pot();
                    let bet_cost = total.saturating_sub(state.seats[player].street_contribution);
                    let folders: Vec<PlayerId> = (0..state.seats.len())
                        .filter(|&p| p != player && !state.seats[p].folded && state.seats[p].stack > 0)
                        .collect();
                    state.apply(player, action)?;

                    let highest = state.highest_contribution();
                    let call_costs: Vec<u64> = folders
                        .iter()
                        .map(|&p| {
                            let seat = &state.seats[p];
                            highest.saturating_sub(seat.street_contribution).min(seat.stack)
                        })
                        .collect();
                    if open.is_some() {
                        discard(&mut open, "superseded by a new bet");
                    }
                    if folders.is_empty() {
                        continue;
                    }
                    open = Some(Accumulator {
                        bettor: player,
                        street: state.street(),
                        board: state.board.clone(),
                        range: before,
                        raise_total: total,
                        pot_before_bet,
                        bet_cost,
                        cost_to_call: call_costs.iter().copied().max().unwrap_or(0),
                        pot_if_called: pot_before_bet + bet_cost + call_costs.iter().sum::<u64>(),
                        pending: folders.clone(),
                        folders,
                        responses: Vec::new(),
                    });
                } else {
                    state.apply(player, action)?;
                    if state.is_action_closed() {
                        discard(&mut open, "action closed");
                    }
                }
            }
            HistoryRow::Showdown { .. } => {
                discard(&mut open, "showdown");
                break;
            }
        }
    }

    for record in &records {
        log::debug!(
            "player {} bet to {} on the {}: mean fold ratio {:.3} over {} combos",
            record.bettor,
            record.raise_total,
            record.street,
            record.mean_fold_ratio(),
            record.combos.len()
        );
    }
    Ok(records)
}
