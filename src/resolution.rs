//! Turning a range split into one realized action.
//!
//! A player commits to fold / passive / aggressive sub-ranges without naming
//! a hand. Resolution picks one combo among the branches that keep the hand
//! going (weighted by combo counts, not range weights), realizes its branch,
//! and re-deals the player's concealed hand from that branch.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cards::{cards_mask, Combo};
use crate::error::{EngineError, EngineResult};
use crate::game::{ActionOptions, ActionResult, GameState, PlayerId};
use crate::range::HandRange;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRangeTriple {
    pub fold: HandRange,
    pub passive: HandRange,
    pub aggressive: HandRange,
    /// Raise total for the aggressive branch.
    #[serde(default)]
    pub raise_total: Option<u64>,
}

impl ActionRangeTriple {
    pub fn new(
        fold: HandRange,
        passive: HandRange,
        aggressive: HandRange,
        raise_total: Option<u64>,
    ) -> ActionRangeTriple {
        ActionRangeTriple {
            fold,
            passive,
            aggressive,
            raise_total,
        }
    }

    /// The sub-range a realized action came from.
    pub fn range_for(&self, action: &ActionResult) -> Option<&HandRange> {
        match action {
            ActionResult::Fold => Some(&self.fold),
            ActionResult::Call => Some(&self.passive),
            ActionResult::RaiseTo(_) => Some(&self.aggressive),
            ActionResult::Terminate => None,
        }
    }

    /// `(action, sub-range)` for each branch, in fold/passive/aggressive order.
    /// The aggressive branch is omitted when no raise total is set.
    pub fn branches(&self) -> Vec<(ActionResult, &HandRange)> {
        let mut out = vec![
            (ActionResult::Fold, &self.fold),
            (ActionResult::Call, &self.passive),
        ];
        if let Some(total) = self.raise_total {
            out.push((ActionResult::RaiseTo(total), &self.aggressive));
        }
        out
    }

    /// Checks that the three sub-ranges partition `original` exactly (same
    /// combos, same weights) and that any raise is legal.
    pub fn validate(&self, original: &HandRange, options: &ActionOptions) -> EngineResult<()> {
        let before = original.weight_map()?;
        let mut after: HashMap<Combo, u32> = HashMap::with_capacity(before.len());
        for part in [&self.fold, &self.passive, &self.aggressive] {
            for (combo, weight) in part.generate(&[]) {
                if after.insert(combo, weight).is_some() {
                    return Err(EngineError::Validation(format!(
                        "{} is assigned to more than one action",
                        combo
                    )));
                }
            }
        }

        for (combo, weight) in &after {
            match before.get(combo) {
                None => {
                    return Err(EngineError::Validation(format!(
                        "{} is not in the range {}",
                        combo, original
                    )))
                }
                Some(w) if w != weight => {
                    return Err(EngineError::Validation(format!(
                        "{} changed weight from {} to {}",
                        combo, w, weight
                    )))
                }
                Some(_) => {}
            }
        }
        if let Some(missing) = before.keys().find(|c| !after.contains_key(c)) {
            return Err(EngineError::Validation(format!(
                "{} is not assigned to any action",
                missing
            )));
        }

        if !self.aggressive.is_empty() {
            if !options.can_raise {
                return Err(EngineError::Validation(
                    "raising is not an option here".to_string(),
                ));
            }
            let total = self.raise_total.ok_or_else(|| {
                EngineError::Validation("a raise range needs a raise total".to_string())
            })?;
            if total < options.min_raise || total > options.max_raise {
                return Err(EngineError::Validation(format!(
                    "raise to {} is outside [{}, {}]",
                    total, options.min_raise, options.max_raise
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub action: ActionResult,
    /// The player's concealed hand after resolution.
    pub holding: Option<Combo>,
    pub current_factor: f64,
}

/// Resolves `triple` for `actor`. Validation happens before anything is drawn.
pub fn resolve_action<R: Rng + ?Sized>(
    state: &GameState,
    actor: PlayerId,
    triple: &ActionRangeTriple,
    options: &ActionOptions,
    rng: &mut R,
) -> EngineResult<Resolution> {
    let seat = state
        .seats
        .get(actor)
        .ok_or_else(|| EngineError::Validation(format!("seat {} does not exist", actor)))?;
    if seat.folded {
        return Err(EngineError::Validation(format!(
            "player {} has already folded",
            actor
        )));
    }
    if state.to_act != Some(actor) {
        return Err(EngineError::Validation(format!(
            "player {} is not the one to act",
            actor
        )));
    }
    triple.validate(&seat.range, options)?;

    let dead = state.dead_cards_for(actor);
    let mut continuing: Vec<(usize, Combo)> = Vec::new();
    let mut terminal = 0usize;
    let branches: Vec<(ActionResult, &HandRange)> = triple
        .branches()
        .into_iter()
        .filter(|(action, range)| {
            !matches!(action, ActionResult::RaiseTo(_)) || !range.is_empty()
        })
        .collect();

    for (idx, (action, range)) in branches.iter().enumerate() {
        let combos = range.combos_avoiding(dead);
        if combos.is_empty() {
            continue;
        }
        if state.branch_continues(actor, action) {
            continuing.extend(combos.into_iter().map(|c| (idx, c)));
        } else {
            terminal += combos.len();
        }
    }

    let total = continuing.len() + terminal;
    if total == 0 {
        log::warn!("player {} has no live combos in any branch", actor);
        return Ok(Resolution {
            action: ActionResult::Terminate,
            holding: seat.holding,
            current_factor: state.current_factor,
        });
    }
    let current_factor = state.current_factor * continuing.len() as f64 / total as f64;

    let Some(&(branch, _)) = continuing.choose(rng) else {
        return Ok(Resolution {
            action: ActionResult::Terminate,
            holding: seat.holding,
            current_factor,
        });
    };
    let (action, range) = branches[branch];

    // Only other players' holdings are excluded here, not the board.
    let redeal: Vec<Combo> = range.combos_avoiding(state.holdings_except(actor));
    let holding = *redeal.choose(rng).ok_or_else(|| {
        EngineError::IncompatibleRanges(format!("nothing left to deal from {}", range))
    })?;
    if holding.mask() & cards_mask(&state.board) != 0 {
        log::warn!(
            "player {} re-dealt {} which shares a card with the board",
            actor,
            holding
        );
    }

    Ok(Resolution {
        action,
        holding: Some(holding),
        current_factor,
    })
}
