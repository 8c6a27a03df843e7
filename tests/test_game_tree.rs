use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use range_ev::cards::*;
use range_ev::config::EngineConfig;
use range_ev::error::EngineError;
use range_ev::game::ActionResult;
use range_ev::game_tree::*;
use range_ev::history::{HandHistory, HistoryRow, SeatSetup};
use range_ev::range::HandRange;
use range_ev::resolution::ActionRangeTriple;

fn r(notation: &str) -> HandRange {
    HandRange::parse(notation).unwrap()
}

fn combo(notation: &str) -> Combo {
    parse_combo(notation).unwrap()
}

fn seat(blind: u64, ante: u64, range: &str) -> SeatSetup {
    SeatSetup {
        stack: 100,
        blind,
        ante,
        range: r(range),
        holding: None,
    }
}

fn split(player: usize, fold: &str, passive: &str, aggressive: &str, raise: Option<u64>) -> HistoryRow {
    HistoryRow::Ranges {
        player,
        triple: ActionRangeTriple::new(r(fold), r(passive), r(aggressive), raise),
    }
}

fn check(player: usize, range: &str) -> Vec<HistoryRow> {
    vec![
        split(player, "nothing", range, "nothing", None),
        HistoryRow::Action {
            player,
            action: ActionResult::Call,
        },
    ]
}

fn act(player: usize, action: ActionResult) -> HistoryRow {
    HistoryRow::Action { player, action }
}

fn board(cards: &str) -> HistoryRow {
    HistoryRow::Board {
        cards: parse_board(cards).unwrap(),
    }
}

fn showdown(hands: &[(usize, &str)]) -> HistoryRow {
    HistoryRow::Showdown {
        hands: hands.iter().map(|&(p, c)| (p, combo(c))).collect(),
    }
}

/// Heads-up: seat 0 posts the big blind and acts first after the flop.
fn heads_up(range0: &str, range1: &str, rows: Vec<HistoryRow>) -> HandHistory {
    HandHistory {
        seats: vec![seat(2, 0, range0), seat(1, 0, range1)],
        big_blind: 2,
        preflop_first: 1,
        current_factor: 1.0,
        rows,
    }
}

/// Limp, check to the river on 2c7d9h Jc Ks, then show down.
fn checked_down(range0: &str, range1: &str) -> Vec<HistoryRow> {
    let mut rows = Vec::new();
    rows.extend(check(1, range1));
    rows.extend(check(0, range0));
    for cards in ["2c7d9h", "Jc", "Ks"] {
        rows.push(board(cards));
        rows.extend(check(0, range0));
        rows.extend(check(1, range1));
    }
    rows
}

fn config() -> EngineConfig {
    EngineConfig {
        seed: Some(1),
        ..EngineConfig::default()
    }
}

fn ev(tree: &mut GameTree, c: &str, player: usize) -> f64 {
    let mut rng = StdRng::seed_from_u64(1);
    tree.combo_ev(combo(c), player, &config(), &mut rng).unwrap()
}

#[test]
fn test_checked_down_is_zero_sum() {
    let mut rows = checked_down("KhKc", "AhAc");
    rows.push(showdown(&[(0, "KhKc"), (1, "AhAc")]));
    let mut tree = GameTree::build(&heads_up("KhKc", "AhAc", rows)).unwrap();

    let kings = ev(&mut tree, "KhKc", 0);
    let aces = ev(&mut tree, "AhAc", 1);
    assert_abs_diff_eq!(kings, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(aces, -2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(kings + aces, 0.0, epsilon = 1e-9);
}

#[test]
fn test_showdown_leaf_records_winner() {
    let mut rows = checked_down("KhKc", "AhAc");
    rows.push(showdown(&[(0, "KhKc"), (1, "AhAc")]));
    let tree = GameTree::build(&heads_up("KhKc", "AhAc", rows)).unwrap();

    let leaves = tree.leaves();
    assert_eq!(leaves.len(), 1);
    let leaf = tree.node(leaves[0]);
    assert_eq!(leaf.action, NodeAction::Showdown);
    let terminal = leaf.terminal.as_ref().unwrap();
    assert_eq!(terminal.winners, vec![0]);
    assert_eq!(terminal.pot, 4);
    assert_eq!(tree.len(), 10);
}

#[test]
fn test_multiway_fold_is_zero_sum() {
    let (r0, r1, r2) = ("KhKc", "AhAc", "7s2h");
    let mut rows = vec![
        split(2, r2, "nothing", "nothing", None),
        act(2, ActionResult::Fold),
    ];
    rows.extend(check(1, r1));
    rows.extend(check(0, r0));
    for cards in ["2c7d9h", "Jc", "Ks"] {
        rows.push(board(cards));
        rows.extend(check(0, r0));
        rows.extend(check(1, r1));
    }
    let history = HandHistory {
        seats: vec![seat(2, 1, r0), seat(1, 1, r1), seat(0, 1, r2)],
        big_blind: 2,
        preflop_first: 2,
        current_factor: 1.0,
        rows,
    };
    let mut tree = GameTree::build(&history).unwrap();

    let evs = [ev(&mut tree, r0, 0), ev(&mut tree, r1, 1), ev(&mut tree, r2, 2)];
    assert_abs_diff_eq!(evs[0], 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evs[1], -3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evs[2], -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evs.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_preflop_fold_is_zero_sum() {
    let rows = vec![split(1, "AhAc", "nothing", "nothing", None), act(1, ActionResult::Fold)];
    let mut tree = GameTree::build(&heads_up("KhKc", "AhAc", rows)).unwrap();
    let kings = ev(&mut tree, "KhKc", 0);
    let aces = ev(&mut tree, "AhAc", 1);
    assert_abs_diff_eq!(kings, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(aces, -1.0, epsilon = 1e-9);
}

#[test]
fn test_implicit_fold_branch() {
    let mut rows = vec![
        split(1, "7s2h", "AhAc", "nothing", None),
        act(1, ActionResult::Call),
    ];
    rows.extend(check(0, "KhKc"));
    for cards in ["2c7d9h", "Jc", "Ks"] {
        rows.push(board(cards));
        rows.extend(check(0, "KhKc"));
        rows.extend(check(1, "AhAc"));
    }
    let mut tree = GameTree::build(&heads_up("KhKc", "AhAc,7s2h", rows)).unwrap();

    let root = tree.root();
    assert_eq!(root.children.len(), 2);
    let fold = root
        .children
        .iter()
        .map(|&id| tree.node(id))
        .find(|n| {
            n.action
                == NodeAction::Act {
                    player: 1,
                    action: ActionResult::Fold,
                }
        })
        .unwrap();
    assert!(fold.is_terminal());
    assert_eq!(fold.terminal.as_ref().unwrap().winners, vec![0]);

    assert_abs_diff_eq!(ev(&mut tree, "7s2h", 1), -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut tree, "AhAc", 1), -2.0, epsilon = 1e-9);
    // Half of seat 1's combos fold (+1 for the blinds), half lose a showdown (+2).
    assert_abs_diff_eq!(ev(&mut tree, "KhKc", 0), 1.5, epsilon = 1e-9);
}

#[test]
fn test_combo_outside_every_branch() {
    let mut rows = vec![
        split(1, "7s2h", "AhAc", "nothing", None),
        act(1, ActionResult::Call),
    ];
    rows.extend(check(0, "KhKc"));
    let mut tree = GameTree::build(&heads_up("KhKc", "AhAc,7s2h", rows)).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let err = tree.combo_ev(combo("QsQd"), 0, &config(), &mut rng);
    assert!(matches!(err, Err(EngineError::InvalidComboForTree { .. })));
}

#[test]
fn test_range_ev_reports_per_combo() {
    let mut rows = vec![
        split(1, "7s2h", "AhAc", "nothing", None),
        act(1, ActionResult::Call),
    ];
    rows.extend(check(0, "KhKc,QsQd"));
    let mut tree = GameTree::build(&heads_up("KhKc,QsQd", "AhAc,7s2h", rows)).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let results = tree.range_ev(1, &config(), &mut rng);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, ev)| ev.is_ok()));
}

#[test]
fn test_merge_sibling_lines() {
    let ranges0 = "KhKc,QsQd";
    let mut prefix = Vec::new();
    prefix.extend(check(1, "AhAc"));
    prefix.extend(check(0, ranges0));
    prefix.push(board("2c7d9h"));
    prefix.push(split(0, "nothing", "KhKc", "QsQd", Some(4)));

    let mut checked = prefix.clone();
    checked.push(act(0, ActionResult::Call));
    checked.extend(check(1, "AhAc"));
    for cards in ["Jc", "Ks"] {
        checked.push(board(cards));
        checked.extend(check(0, "KhKc"));
        checked.extend(check(1, "AhAc"));
    }
    checked.push(showdown(&[(0, "KhKc"), (1, "AhAc")]));

    let mut bet = prefix;
    bet.push(act(0, ActionResult::RaiseTo(4)));
    bet.push(split(1, "AhAc", "nothing", "nothing", None));
    bet.push(act(1, ActionResult::Fold));

    let a = GameTree::build(&heads_up(ranges0, "AhAc", checked)).unwrap();
    let b = GameTree::build(&heads_up(ranges0, "AhAc", bet)).unwrap();
    assert_eq!(a.len(), 10);
    assert_eq!(b.len(), 5);

    let mut merged = GameTree::merge(vec![a, b]).unwrap();
    assert_eq!(merged.len(), 12);
    assert_eq!(merged.leaves().len(), 2);

    let fold_leaf = merged
        .leaves()
        .into_iter()
        .find(|&id| merged.node(id).action != NodeAction::Showdown)
        .unwrap();
    assert_eq!(merged.line(fold_leaf).len(), 4);
    assert_eq!(merged.node(fold_leaf).pot(), 8);

    assert_abs_diff_eq!(ev(&mut merged, "KhKc", 0), 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut merged, "QsQd", 0), 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut merged, "AhAc", 1), -2.0, epsilon = 1e-9);
}

#[test]
fn test_merge_needs_a_tree() {
    assert!(GameTree::merge(Vec::new()).is_err());
}

#[test]
fn test_terminate_adds_terminal_branches() {
    let mut rows = checked_down("KhKc", "AhAc,QsQd");
    // Replace the last river check by a bet that every response ends.
    rows.truncate(rows.len() - 4);
    rows.push(split(0, "nothing", "nothing", "KhKc", Some(10)));
    rows.push(act(0, ActionResult::RaiseTo(10)));
    rows.push(split(1, "QsQd", "AhAc", "nothing", None));
    rows.push(act(1, ActionResult::Terminate));
    rows.push(showdown(&[(0, "KhKc"), (1, "AhAc")]));
    let mut tree = GameTree::build(&heads_up("KhKc", "AhAc,QsQd", rows)).unwrap();

    let bet = tree
        .leaves()
        .into_iter()
        .filter_map(|id| tree.node(id).parent)
        .next()
        .unwrap();
    let children = &tree.node(bet).children;
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|&id| tree.node(id).is_terminal()));
    assert!(tree.leaves().iter().all(|&id| tree.node(id).action != NodeAction::Showdown));

    // QsQd folds for -2; AhAc calls 10 and loses to trip kings.
    assert_abs_diff_eq!(ev(&mut tree, "QsQd", 1), -2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut tree, "AhAc", 1), -12.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut tree, "KhKc", 0), 0.5 * 2.0 + 0.5 * 12.0, epsilon = 1e-9);
}

#[test]
fn test_history_from_json() {
    let json = r#"{
        "seats": [
            {"stack": 100, "blind": 2, "range": "KhKc"},
            {"stack": 100, "blind": 1, "range": "AhAc"}
        ],
        "big_blind": 2,
        "preflop_first": 1,
        "rows": [
            {"kind": "ranges", "player": 1,
             "triple": {"fold": "AhAc", "passive": "nothing", "aggressive": "nothing"}},
            {"kind": "action", "player": 1, "action": {"type": "fold"}}
        ]
    }"#;
    let history: HandHistory = serde_json::from_str(json).unwrap();
    let mut tree = GameTree::build(&history).unwrap();
    assert_eq!(tree.len(), 2);
    assert_abs_diff_eq!(ev(&mut tree, "KhKc", 0), 1.0, epsilon = 1e-9);
}

#[test]
fn test_range_ev_reports_board_blocked_combos() {
    let mut rows = Vec::new();
    rows.extend(check(1, "KK"));
    rows.extend(check(0, "AA"));
    for cards in ["As7d2c", "Jh", "3s"] {
        rows.push(board(cards));
        rows.extend(check(0, "AA"));
        rows.extend(check(1, "KK"));
    }
    let mut tree = GameTree::build(&heads_up("AA", "KK", rows)).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let results = tree.range_ev(0, &config(), &mut rng);
    assert_eq!(results.len(), 6);

    let ace_of_spades = parse_card("As").unwrap();
    for (combo, result) in &results {
        if combo.contains(ace_of_spades) {
            assert!(matches!(result, Err(EngineError::IncompatibleRanges(_))), "{}", combo);
        } else {
            assert_abs_diff_eq!(*result.as_ref().unwrap(), 2.0, epsilon = 1e-9);
        }
    }
    assert_eq!(results.iter().filter(|(_, r)| r.is_ok()).count(), 3);
}

#[test]
fn test_last_caller_on_the_river_gets_a_fold_leaf() {
    let (r0, r1, r2) = ("KhKc", "AhAc,QsQd", "JsJd,8s8d");
    let mut rows = Vec::new();
    rows.extend(check(0, r0));
    rows.extend(check(1, r1));
    rows.extend(check(2, r2));
    for cards in ["2c7d9h", "4c"] {
        rows.push(board(cards));
        rows.extend(check(0, r0));
        rows.extend(check(1, r1));
        rows.extend(check(2, r2));
    }
    rows.push(board("5s"));
    rows.push(split(0, "nothing", "nothing", r0, Some(10)));
    rows.push(act(0, ActionResult::RaiseTo(10)));
    rows.push(split(1, "QsQd", "AhAc", "nothing", None));
    rows.push(act(1, ActionResult::Call));
    rows.push(split(2, "8s8d", "JsJd", "nothing", None));
    rows.push(act(2, ActionResult::Call));
    let history = HandHistory {
        seats: vec![seat(0, 1, r0), seat(0, 1, r1), seat(0, 1, r2)],
        big_blind: 2,
        preflop_first: 0,
        current_factor: 1.0,
        rows,
    };
    let mut tree = GameTree::build(&history).unwrap();

    let fold_of = |player| NodeAction::Act {
        player,
        action: ActionResult::Fold,
    };
    let folds: Vec<NodeId> = (0..tree.len())
        .filter(|&id| tree.node(id).action == fold_of(2))
        .collect();
    assert_eq!(folds.len(), 1);
    let fold = tree.node(folds[0]);
    assert!(fold.is_terminal());
    assert_eq!(fold.pot(), 23);
    let parent = tree.node(fold.parent.unwrap());
    assert_eq!(
        parent.action,
        NodeAction::Act {
            player: 1,
            action: ActionResult::Call
        }
    );
    // Seat 1 was not last to act, so its fold is not a line of its own.
    assert!((0..tree.len()).all(|id| tree.node(id).action != fold_of(1)));

    assert_abs_diff_eq!(ev(&mut tree, "8s8d", 2), -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut tree, "JsJd", 2), -11.0, epsilon = 1e-9);
    // Aces win 23 - 11 when eights fold and 33 - 11 when jacks call.
    assert_abs_diff_eq!(ev(&mut tree, "AhAc", 1), 17.0, epsilon = 1e-9);
    assert_abs_diff_eq!(ev(&mut tree, "KhKc", 0), -11.0, epsilon = 1e-9);
}

#[test]
fn test_merge_sums_line_weights() {
    let rows = vec![split(1, "AhAc", "nothing", "nothing", None), act(1, ActionResult::Fold)];
    let mut first = heads_up("KhKc", "AhAc", rows.clone());
    first.current_factor = 0.25;
    let mut second = heads_up("KhKc", "AhAc", rows);
    second.current_factor = 0.5;

    let a = GameTree::build(&first).unwrap();
    assert_abs_diff_eq!(a.root().weight, 0.25, epsilon = 1e-12);
    let merged = GameTree::merge(vec![a, GameTree::build(&second).unwrap()]).unwrap();
    assert_eq!(merged.len(), 2);
    assert_abs_diff_eq!(merged.root().weight, 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(merged.node(merged.leaves()[0]).weight, 0.75, epsilon = 1e-12);
}
