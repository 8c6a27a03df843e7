use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use range_ev::cards::*;
use range_ev::error::EngineError;
use range_ev::game::*;
use range_ev::history::{HandHistory, SeatSetup};
use range_ev::range::HandRange;
use range_ev::resolution::*;

fn r(notation: &str) -> HandRange {
    HandRange::parse(notation).unwrap()
}

fn setup(range: &str) -> SeatSetup {
    SeatSetup {
        stack: 100,
        blind: 0,
        ante: 1,
        range: r(range),
        holding: None,
    }
}

/// Two players on a 2c7d9h flop with a pot of 2; seat 0 acts first.
fn flop_state(range0: &str, range1: &str) -> GameState {
    flop_state_on("2c7d9h", range0, range1)
}

fn flop_state_on(flop: &str, range0: &str, range1: &str) -> GameState {
    let mut state = HandHistory {
        seats: vec![setup(range0), setup(range1)],
        big_blind: 2,
        preflop_first: 0,
        current_factor: 1.0,
        rows: Vec::new(),
    }
    .initial_state()
    .unwrap();
    state.apply(0, &ActionResult::Call).unwrap();
    state.apply(1, &ActionResult::Call).unwrap();
    state.advance_street(&parse_board(flop).unwrap()).unwrap();
    state
}

fn river_state(range0: &str, range1: &str) -> GameState {
    let mut state = flop_state(range0, range1);
    for card in ["Jc", "Ks"] {
        state.apply(0, &ActionResult::Call).unwrap();
        state.apply(1, &ActionResult::Call).unwrap();
        state.advance_street(&[parse_card(card).unwrap()]).unwrap();
    }
    state
}

fn triple(fold: &str, passive: &str, aggressive: &str, raise: Option<u64>) -> ActionRangeTriple {
    ActionRangeTriple::new(r(fold), r(passive), r(aggressive), raise)
}

#[test]
fn test_partition_accepts_exact_split() {
    let state = flop_state("AA,KK,QQ", "anything");
    let options = state.current_options(0).unwrap();
    assert!(triple("QQ", "KK", "AA", Some(6))
        .validate(&state.seats[0].range, &options)
        .is_ok());
}

#[test]
fn test_partition_rejects_missing_extra_and_duplicate() {
    let state = flop_state("AA,KK,QQ", "anything");
    let original = &state.seats[0].range;
    let options = state.current_options(0).unwrap();

    let missing = triple("QQ", "KK", "nothing", None);
    let extra = triple("QQ,JJ", "KK", "AA", Some(6));
    let duplicate = triple("QQ,AsAh", "KK", "AA", Some(6));
    let reweighted = triple("QQ(2)", "KK", "AA", Some(6));
    for bad in [missing, extra, duplicate, reweighted] {
        let err = bad.validate(original, &options).unwrap_err();
        assert!(err.is_validation(), "{}", err);
    }
}

#[test]
fn test_partition_keeps_weights() {
    let state = flop_state("AA(3),KK", "anything");
    let options = state.current_options(0).unwrap();
    assert!(triple("nothing", "KK", "AA(3)", Some(6))
        .validate(&state.seats[0].range, &options)
        .is_ok());
    assert!(triple("nothing", "KK", "AA", Some(6))
        .validate(&state.seats[0].range, &options)
        .is_err());
}

#[test]
fn test_raise_bounds() {
    let state = flop_state("AA,KK", "anything");
    let original = &state.seats[0].range;
    let options = state.current_options(0).unwrap();
    assert!(triple("nothing", "KK", "AA", None).validate(original, &options).is_err());
    assert!(triple("nothing", "KK", "AA", Some(1)).validate(original, &options).is_err());
    assert!(triple("nothing", "KK", "AA", Some(500)).validate(original, &options).is_err());
    assert!(triple("nothing", "KK", "AA", Some(options.max_raise))
        .validate(original, &options)
        .is_ok());
}

#[test]
fn test_raise_range_when_raising_is_closed() {
    let mut state = flop_state("AA,KK", "AA,KK");
    state.apply(0, &ActionResult::RaiseTo(state.seats[0].stack)).unwrap();
    let options = state.current_options(1).unwrap();
    assert!(!options.can_raise);
    let err = triple("nothing", "KK", "AA", Some(100))
        .validate(&state.seats[1].range, &options)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn test_resolution_weights_by_combo_count() {
    let state = flop_state("AA,KK,QQ", "anything");
    let options = state.current_options(0).unwrap();
    let split = triple("QQ", "KK", "AA", Some(6));

    let mut seen_call = false;
    let mut seen_raise = false;
    for seed in 0..40 {
        let mut rng = StdRng::seed_from_u64(seed);
        let res = resolve_action(&state, 0, &split, &options, &mut rng).unwrap();
        assert_abs_diff_eq!(res.current_factor, 12.0 / 18.0, epsilon = 1e-12);
        let holding = res.holding.unwrap();
        match res.action {
            ActionResult::Call => {
                seen_call = true;
                assert!(split.passive.contains(&holding));
            }
            ActionResult::RaiseTo(6) => {
                seen_raise = true;
                assert!(split.aggressive.contains(&holding));
            }
            other => panic!("fold is terminal here, got {}", other),
        }
    }
    assert!(seen_call && seen_raise);
}

#[test]
fn test_all_terminal_branches_terminate() {
    let mut state = river_state("anything", "KK,QQ");
    state.apply(0, &ActionResult::RaiseTo(10)).unwrap();
    let options = state.current_options(1).unwrap();
    let split = triple("QQ", "KK", "nothing", None);
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let res = resolve_action(&state, 1, &split, &options, &mut rng).unwrap();
        assert_eq!(res.action, ActionResult::Terminate);
        assert_eq!(res.current_factor, 0.0);
        assert_eq!(res.holding, None);
    }
}

#[test]
fn test_river_raise_is_the_only_continuation() {
    let mut state = river_state("anything", "AA,KK,QQ");
    state.apply(0, &ActionResult::RaiseTo(10)).unwrap();
    let options = state.current_options(1).unwrap();
    let split = triple("QQ", "KK", "AA", Some(30));
    let mut rng = StdRng::seed_from_u64(3);
    let res = resolve_action(&state, 1, &split, &options, &mut rng).unwrap();
    assert_eq!(res.action, ActionResult::RaiseTo(30));
    // Ks on the board leaves three KK combos live: 6 AA of 15 live combos.
    assert_abs_diff_eq!(res.current_factor, 6.0 / 15.0, epsilon = 1e-12);
}

#[test]
fn test_redeal_avoids_other_holdings() {
    let mut state = flop_state("AA,KK", "anything");
    state.seats[1].holding = Some(parse_combo("AhAd").unwrap());
    let options = state.current_options(0).unwrap();
    let split = triple("nothing", "AA", "KK", Some(6));
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let res = resolve_action(&state, 0, &split, &options, &mut rng).unwrap();
        assert_abs_diff_eq!(res.current_factor, 1.0, epsilon = 1e-12);
        if res.action == ActionResult::Call {
            assert_eq!(res.holding, Some(parse_combo("AsAc").unwrap()));
        }
    }
}

#[test]
fn test_redeal_ignores_the_board() {
    let state = flop_state_on("Ks7d2c", "AA,KK,QQ", "anything");
    let options = state.current_options(0).unwrap();
    let split = triple("QQ", "KK", "AA", Some(6));
    let king_of_spades = parse_card("Ks").unwrap();

    let mut board_kings = 0;
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let res = resolve_action(&state, 0, &split, &options, &mut rng).unwrap();
        // Ks leaves 3 live KK: 9 continuing of 15 live combos.
        assert_abs_diff_eq!(res.current_factor, 9.0 / 15.0, epsilon = 1e-12);
        if res.action == ActionResult::Call {
            let holding = res.holding.unwrap();
            assert!(split.passive.contains(&holding));
            if holding.contains(king_of_spades) {
                board_kings += 1;
            }
        }
    }
    assert!(board_kings > 0);
}

#[test]
fn test_resolution_requires_the_player_to_act() {
    let state = flop_state("AA,KK", "AA,KK");
    let split = triple("nothing", "AA,KK", "nothing", None);
    let mut rng = StdRng::seed_from_u64(0);

    let options = state.current_options(1).unwrap();
    let err = resolve_action(&state, 1, &split, &options, &mut rng);
    assert!(matches!(err, Err(EngineError::Validation(_))));

    let mut folded = state.clone();
    folded.seats[0].folded = true;
    let options = folded.current_options(0).unwrap();
    let err = resolve_action(&folded, 0, &split, &options, &mut rng);
    assert!(matches!(err, Err(EngineError::Validation(_))));
}

#[test]
fn test_invalid_split_fails_before_drawing() {
    let state = flop_state("AA,KK", "anything");
    let options = state.current_options(0).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let err = resolve_action(&state, 0, &triple("AA", "nothing", "nothing", None), &options, &mut rng);
    assert!(matches!(err, Err(EngineError::Validation(_))));
}

#[test]
fn test_triple_json() {
    let split = triple("QQ", "KK", "AA", Some(6));
    let json = serde_json::to_string(&split).unwrap();
    let back: ActionRangeTriple = serde_json::from_str(&json).unwrap();
    assert_eq!(back, split);
    let no_raise: ActionRangeTriple =
        serde_json::from_str(r#"{"fold":"QQ","passive":"KK","aggressive":"nothing"}"#).unwrap();
    assert_eq!(no_raise.raise_total, None);
}
