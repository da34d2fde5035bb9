//! Board state tests
//!
//! Legal-move generation, immutability of transitions, paint exclusivity and
//! goal detection, checked on hand-built maps and on seeded random playouts.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spaceship_painter::board::{BoardState, IllegalActionError};
use spaceship_painter::map::parse_map;
use spaceship_painter::types::{Action, Coord, PlayerId};

const EXAMPLE_MAP: &str = "aaa0_b_\n__a__b_\n__A__b_\n__0__b_\n_____b_\n____0bB";
const THREE_PLAYER_MAP: &str = "A___0__\n_0___0_\n___C___\n_0___0_\n__0___B";

fn coord(row: usize, col: usize) -> Coord {
    Coord::new(row, col)
}

/// Plays random legal moves until the goal, returning every visited state
fn random_playout(initial: BoardState, seed: u64) -> Vec<BoardState> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut states = vec![initial];
    loop {
        let current = states.last().unwrap();
        if current.is_goal_state() {
            break;
        }
        let actions = current.legal_actions();
        let action = actions[rng.random_range(0..actions.len())];
        let next = current.generate_successor(&action).unwrap();
        states.push(next);
    }
    states
}

#[test]
fn test_one_row_scenario_long_step_and_stay() {
    let state = parse_map("A__", 5).unwrap();
    let a = PlayerId::new(0).unwrap();

    let actions = state.legal_actions();
    let long = Action::new(coord(0, 0), coord(0, 2));
    let one = Action::new(coord(0, 0), coord(0, 1));
    let stay = Action::stay(coord(0, 0));
    assert!(actions.contains(&long));
    assert!(actions.contains(&one));
    assert!(actions.contains(&stay));
    assert_eq!(actions, &[long, one, stay]);

    let next = state.generate_successor(&long).unwrap();
    assert_eq!(next.score(a), 3);
    assert_eq!(next.to_display_string(), "a a A");
}

#[test]
fn test_non_terminal_states_always_offer_stay() {
    for (map, seed) in [(EXAMPLE_MAP, 1), (THREE_PLAYER_MAP, 2), (EXAMPLE_MAP, 3)] {
        let states = random_playout(parse_map(map, 8).unwrap(), seed);
        for state in states.iter().filter(|s| !s.is_goal_state()) {
            let ship = state.ship_position(state.active_player());
            let actions = state.legal_actions();
            assert!(!actions.is_empty());
            assert_eq!(actions.last(), Some(&Action::stay(ship)));
            assert!(actions.iter().all(|a| a.source == ship));
        }
    }
}

#[test]
fn test_generate_successor_leaves_input_unchanged() {
    let states = random_playout(parse_map(THREE_PLAYER_MAP, 4).unwrap(), 7);
    for state in states.iter().filter(|s| !s.is_goal_state()) {
        let before = state.clone();
        let display = state.to_display_string();
        let legal = state.legal_actions().to_vec();
        for action in &legal {
            let _ = state.generate_successor(action).unwrap();
            assert_eq!(state, &before);
            assert_eq!(state.to_display_string(), display);
            assert_eq!(state.legal_actions(), legal.as_slice());
        }
    }
}

#[test]
fn test_paint_exclusivity_after_every_transition() {
    for seed in 0..5 {
        let states = random_playout(parse_map(THREE_PLAYER_MAP, 10).unwrap(), seed);
        for state in &states {
            let players: Vec<PlayerId> = state.players().collect();
            for (i, a) in players.iter().enumerate() {
                for b in &players[i + 1..] {
                    assert!(state.painted_mask(*a).is_disjoint(state.painted_mask(*b)));
                    assert!(state.ship_mask(*a).is_disjoint(state.ship_mask(*b)));
                }
                assert!(state.painted_mask(*a).is_disjoint(state.obstacles()));
                assert_eq!(state.ship_mask(*a).count_ones(), 1);
            }
        }
    }
}

#[test]
fn test_goal_state_matches_union_or_round_limit() {
    for seed in 10..15 {
        let states = random_playout(parse_map(EXAMPLE_MAP, 6).unwrap(), seed);
        for state in &states {
            let expected =
                state.occupancy().is_full() || state.current_round() == state.max_rounds();
            assert_eq!(state.is_goal_state(), expected);
        }
        let last = states.last().unwrap();
        assert!(last.is_goal_state());
        assert!(last.legal_actions().is_empty());
    }
}

#[test]
fn test_full_board_is_goal_and_rejects_moves() {
    let state = parse_map("A_", 5).unwrap();
    let painted = state
        .generate_successor(&Action::new(coord(0, 0), coord(0, 1)))
        .unwrap();
    assert!(painted.is_goal_state());
    assert_eq!(painted.current_round(), 1);
    assert!(painted.legal_actions().is_empty());
    assert_eq!(
        painted.generate_successor(&Action::stay(coord(0, 1))),
        Err(IllegalActionError::TerminalState { round: 1 })
    );
}

#[test]
fn test_round_limit_ends_game() {
    let state = parse_map("A___\n___B", 1).unwrap();
    let after_a = state
        .generate_successor(&Action::stay(coord(0, 0)))
        .unwrap();
    assert!(!after_a.is_goal_state());
    let after_b = after_a
        .generate_successor(&Action::stay(coord(1, 3)))
        .unwrap();
    assert_eq!(after_b.current_round(), 1);
    assert!(after_b.is_goal_state());
    assert!(after_b.legal_actions().is_empty());
    assert!(after_b
        .generate_successor(&Action::stay(coord(0, 0)))
        .is_err());
}

#[test]
fn test_zero_round_limit_is_goal_immediately() {
    let state = parse_map("A__", 0).unwrap();
    assert!(state.is_goal_state());
    assert!(state.legal_actions().is_empty());
}

#[test]
fn test_scores_are_paint_popcounts() {
    let state = parse_map(EXAMPLE_MAP, 5).unwrap();
    let scores = state.scores();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[&PlayerId::new(0).unwrap()], 5);
    assert_eq!(scores[&PlayerId::new(1).unwrap()], 7);
    assert_eq!(state.score_vector(), vec![5, 7]);
}
