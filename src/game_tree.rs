//! Decision trees rebuilt from finished hands, and per-combo EV over them.
//!
//! Nodes live in an arena owned by the tree. Each node owns its children
//! through `children` and points back at its parent by id.

use std::collections::HashMap;

use rand::Rng;

use crate::cards::{cards_mask, Card, Combo};
use crate::config::EngineConfig;
use crate::equity::{showdown, showdown_equity};
use crate::error::{EngineError, EngineResult};
use crate::game::{ActionResult, GameState, PlayerId, Street};
use crate::history::{HandHistory, HistoryRow};
use crate::range::HandRange;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeAction {
    Root,
    Act { player: PlayerId, action: ActionResult },
    Showdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    /// Known winners. Empty when the pot is decided by equity over ranges.
    pub winners: Vec<PlayerId>,
    pub pot: u64,
}

impl Terminal {
    fn from_state(state: &GameState) -> Terminal {
        let unfolded = state.unfolded();
        Terminal {
            winners: if unfolded.len() == 1 { unfolded } else { Vec::new() },
            pot: state.pot(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub street: Street,
    pub board: Vec<Card>,
    pub action: NodeAction,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Each player's range at this node.
    pub ranges: Vec<HandRange>,
    /// Players who have not folded.
    pub live: Vec<bool>,
    pub contributions: Vec<u64>,
    pub terminal: Option<Terminal>,
    /// Summed line weight of the hands that pass through this node.
    pub weight: f64,
    memo: HashMap<(Combo, PlayerId), f64>,
}

impl TreeNode {
    fn snapshot(state: &GameState, action: NodeAction, parent: Option<NodeId>) -> TreeNode {
        TreeNode {
            street: state.street(),
            board: state.board.clone(),
            action,
            parent,
            children: Vec::new(),
            ranges: state.seats.iter().map(|s| s.range.clone()).collect(),
            live: state.seats.iter().map(|s| !s.folded).collect(),
            contributions: state.seats.iter().map(|s| s.total_contribution).collect(),
            terminal: None,
            weight: state.current_factor,
            memo: HashMap::new(),
        }
    }

    /// The player whose action led here.
    pub fn actor(&self) -> Option<PlayerId> {
        match self.action {
            NodeAction::Act { player, .. } => Some(player),
            NodeAction::Root | NodeAction::Showdown => None,
        }
    }

    pub fn pot(&self) -> u64 {
        self.contributions.iter().sum()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn live_players(&self) -> Vec<PlayerId> {
        (0..self.live.len()).filter(|&p| self.live[p]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<TreeNode>,
}

impl GameTree {
    pub const ROOT: NodeId = 0;

    /// Replays one finished hand into a tree.
    pub fn build(history: &HandHistory) -> EngineResult<GameTree> {
        let mut state = history.initial_state()?;
        let mut tree = GameTree {
            nodes: vec![TreeNode::snapshot(&state, NodeAction::Root, None)],
        };
        let mut current = Self::ROOT;
        let mut declared = None;
        let mut finished = false;

        for row in &history.rows {
            if finished {
                log::debug!("ignoring {:?} after the hand ended", row);
                continue;
            }
            match row {
                HistoryRow::Board { cards } => state.advance_street(cards)?,
                HistoryRow::Ranges { player, triple } => {
                    let player = *player;
                    if player >= state.seats.len() {
                        return Err(EngineError::Validation(format!(
                            "seat {} does not exist",
                            player
                        )));
                    }
                    // A fold that ends the hand is a line of its own even when unobserved.
                    let last_to_act = state.street() == Street::River
                        && state.owing_count() == 1
                        && state.seats[player].owes_action;
                    if !triple.fold.is_empty() && (state.unfolded_count() == 2 || last_to_act) {
                        tree.add_branch(
                            current,
                            &state,
                            player,
                            &ActionResult::Fold,
                            Some(&triple.fold),
                            true,
                        )?;
                    }
                    declared = Some((player, triple.clone()));
                }
                HistoryRow::Action { player, action } => {
                    let player = *player;
                    let triple = match declared.take() {
                        Some((p, t)) if p == player => Some(t),
                        _ => None,
                    };
                    if *action == ActionResult::Terminate {
                        if let Some(triple) = &triple {
                            for (branch, range) in triple.branches() {
                                if !range.is_empty() && !state.branch_continues(player, &branch) {
                                    tree.add_branch(current, &state, player, &branch, Some(range), true)?;
                                }
                            }
                        }
                        finished = true;
                        continue;
                    }
                    let range = triple.as_ref().and_then(|t| t.range_for(action));
                    let (id, next) = tree.add_branch(current, &state, player, action, range, false)?;
                    current = id;
                    state = next;
                }
                HistoryRow::Showdown { hands } => {
                    let mut terminal = Terminal::from_state(&state);
                    if !hands.is_empty() && state.board.len() == 5 {
                        let mut seen = cards_mask(&state.board);
                        for (_, combo) in hands {
                            if seen & combo.mask() != 0 {
                                return Err(EngineError::DuplicateCard(combo.to_string()));
                            }
                            seen |= combo.mask();
                        }
                        terminal.winners = showdown(&state.board, hands)?.winners;
                    }
                    let mut node = TreeNode::snapshot(&state, NodeAction::Showdown, Some(current));
                    node.terminal = Some(terminal);
                    current = tree.attach(current, node);
                    finished = true;
                }
            }
        }

        for node in tree.nodes.iter_mut() {
            if node.children.is_empty() && node.terminal.is_none() {
                let live = node.live_players();
                node.terminal = Some(Terminal {
                    winners: if live.len() == 1 { live } else { Vec::new() },
                    pot: node.pot(),
                });
            }
        }
        Ok(tree)
    }

    /// Combines trees of hands spawned from a shared lineage. Nodes match on
    /// street and action; unmatched subtrees are copied over.
    pub fn merge(trees: Vec<GameTree>) -> EngineResult<GameTree> {
        let mut trees = trees.into_iter();
        let mut base = trees
            .next()
            .ok_or_else(|| EngineError::Validation("no trees to merge".to_string()))?;
        for other in trees {
            base.nodes[Self::ROOT].weight += other.root().weight;
            base.graft(Self::ROOT, &other, Self::ROOT);
        }
        for node in base.nodes.iter_mut() {
            node.memo.clear();
        }
        Ok(base)
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[Self::ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| self.nodes[id].children.is_empty())
            .collect()
    }

    /// Actions from the root down to `id`.
    pub fn line(&self, id: NodeId) -> Vec<NodeAction> {
        let mut out = Vec::new();
        let mut cursor = Some(id);
        while let Some(n) = cursor {
            let node = &self.nodes[n];
            if node.action != NodeAction::Root {
                out.push(node.action);
            }
            cursor = node.parent;
        }
        out.reverse();
        out
    }

    fn find_child(&self, parent: NodeId, street: Street, action: NodeAction) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].street == street && self.nodes[c].action == action)
    }

    fn attach(&mut self, parent: NodeId, mut node: TreeNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Adds (or reuses) the child for `player` taking `action` from `state`.
    fn add_branch(
        &mut self,
        parent: NodeId,
        state: &GameState,
        player: PlayerId,
        action: &ActionResult,
        range: Option<&HandRange>,
        terminal: bool,
    ) -> EngineResult<(NodeId, GameState)> {
        let mut next = state.clone();
        if let Some(range) = range {
            next.seats[player].range = range.clone();
        }
        next.apply(player, action)?;

        let node_action = NodeAction::Act {
            player,
            action: *action,
        };
        let ends = terminal || next.unfolded_count() <= 1;
        let id = match self.find_child(parent, next.street(), node_action) {
            Some(id) => id,
            None => self.attach(parent, TreeNode::snapshot(&next, node_action, Some(parent))),
        };
        if ends && self.nodes[id].terminal.is_none() {
            self.nodes[id].terminal = Some(Terminal::from_state(&next));
        }
        Ok((id, next))
    }

    fn graft(&mut self, into: NodeId, other: &GameTree, from: NodeId) {
        for &child in &other.nodes[from].children {
            let theirs = &other.nodes[child];
            match self.find_child(into, theirs.street, theirs.action) {
                Some(existing) => {
                    self.nodes[existing].weight += theirs.weight;
                    self.graft(existing, other, child);
                }
                None => {
                    self.copy_subtree(into, other, child);
                }
            }
        }
    }

    fn copy_subtree(&mut self, parent: NodeId, other: &GameTree, from: NodeId) -> NodeId {
        let mut node = other.nodes[from].clone();
        node.children.clear();
        let id = self.attach(parent, node);
        for &child in &other.nodes[from].children {
            self.copy_subtree(id, other, child);
        }
        id
    }

    /// EV of `player` holding `combo`, from the root.
    pub fn combo_ev<R: Rng + ?Sized>(
        &mut self,
        combo: Combo,
        player: PlayerId,
        config: &EngineConfig,
        rng: &mut R,
    ) -> EngineResult<f64> {
        if player >= self.root().ranges.len() {
            return Err(EngineError::Validation(format!(
                "seat {} does not exist",
                player
            )));
        }
        self.node_ev(Self::ROOT, combo, player, config, rng)
    }

    /// EV of every combo in `player`'s root range. Failures are reported per combo.
    pub fn range_ev<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        config: &EngineConfig,
        rng: &mut R,
    ) -> Vec<(Combo, EngineResult<f64>)> {
        let root = self.root();
        let combos: Vec<Combo> = match root.ranges.get(player) {
            Some(range) => range
                .generate(&root.board)
                .into_iter()
                .map(|(c, _)| c)
                .collect(),
            None => Vec::new(),
        };
        combos
            .into_iter()
            .map(|combo| (combo, self.combo_ev(combo, player, config, rng)))
            .collect()
    }

    fn node_ev<R: Rng + ?Sized>(
        &mut self,
        id: NodeId,
        combo: Combo,
        player: PlayerId,
        config: &EngineConfig,
        rng: &mut R,
    ) -> EngineResult<f64> {
        if let Some(&ev) = self.nodes[id].memo.get(&(combo, player)) {
            return Ok(ev);
        }
        let ev = if self.nodes[id].is_terminal() || self.nodes[id].children.is_empty() {
            self.terminal_ev(id, combo, player, config, rng)?
        } else {
            self.decision_ev(id, combo, player, config, rng)?
        };
        self.nodes[id].memo.insert((combo, player), ev);
        Ok(ev)
    }

    fn terminal_ev<R: Rng + ?Sized>(
        &self,
        id: NodeId,
        combo: Combo,
        player: PlayerId,
        config: &EngineConfig,
        rng: &mut R,
    ) -> EngineResult<f64> {
        let node = &self.nodes[id];
        let contributed = node.contributions[player] as f64;
        let pot = node.pot() as f64;
        if !node.live[player] {
            return Ok(-contributed);
        }
        let live = node.live_players();
        if live.len() == 1 {
            return Ok(pot - contributed);
        }

        let mut ranges = vec![HandRange::single(combo)];
        ranges.extend(
            live.iter()
                .filter(|&&p| p != player)
                .map(|&p| node.ranges[p].clone()),
        );
        let result = showdown_equity(&ranges, &node.board, config.hard_limit, config.iterations, rng)?;
        let equity = result.equities.first().copied().ok_or_else(|| {
            EngineError::IncompatibleRanges(format!(
                "{} cannot be dealt against the other ranges at showdown",
                combo
            ))
        })?;
        Ok(equity * pot - contributed)
    }

    fn decision_ev<R: Rng + ?Sized>(
        &mut self,
        id: NodeId,
        combo: Combo,
        player: PlayerId,
        config: &EngineConfig,
        rng: &mut R,
    ) -> EngineResult<f64> {
        let children = self.nodes[id].children.clone();
        let actor = self.nodes[children[0]].actor();
        if children.iter().any(|&c| self.nodes[c].actor() != actor) {
            return Err(EngineError::InternalInconsistency(format!(
                "node {} has children acted by different players",
                id
            )));
        }

        match actor {
            None => self.node_ev(children[0], combo, player, config, rng),
            Some(acting) if acting == player => {
                let matching: Vec<NodeId> = children
                    .iter()
                    .copied()
                    .filter(|&c| self.nodes[c].ranges[player].contains(&combo))
                    .collect();
                match matching.as_slice() {
                    [only] => self.node_ev(*only, combo, player, config, rng),
                    [] => Err(EngineError::InvalidComboForTree {
                        combo: combo.to_string(),
                    }),
                    _ => Err(EngineError::InternalInconsistency(format!(
                        "{} appears in {} branches of node {}",
                        combo,
                        matching.len(),
                        id
                    ))),
                }
            }
            Some(acting) => {
                // Relative combo counts stand in for the branch probabilities.
                let counts: Vec<usize> = children
                    .iter()
                    .map(|&c| {
                        let node = &self.nodes[c];
                        let dead = combo.mask() | cards_mask(&node.board);
                        node.ranges[acting].combos_avoiding(dead).len()
                    })
                    .collect();
                let total: usize = counts.iter().sum();
                if total == 0 {
                    return Err(EngineError::IncompatibleRanges(format!(
                        "player {} has no combos left against {}",
                        acting, combo
                    )));
                }
                let mut ev = 0.0;
                for (&child, &count) in children.iter().zip(&counts) {
                    if count == 0 {
                        continue;
                    }
                    let p = count as f64 / total as f64;
                    ev += p * self.node_ev(child, combo, player, config, rng)?;
                }
                Ok(ev)
            }
        }
    }
}
