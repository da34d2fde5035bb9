// Depth-limited adversarial search: MaxN and two-role Minimax
//
// Both searches are pure over BoardState: children are derived with
// `generate_successor`, so branches share nothing mutable and the root's
// children can be evaluated on the rayon pool. Results are folded in
// legal-action order with a strict comparison, which keeps the earliest
// action on ties whether the root ran sequentially or in parallel.

use log::debug;
use rayon::prelude::*;
use std::time::Duration;

use crate::agents::{Agent, AgentError, AgentId, AgentKind, SearchContext};
use crate::board::BoardState;
use crate::types::{Action, PlayerId};

/// Keeps the first candidate that `improves` on every earlier one.
/// Candidates are consumed in order; the first error aborts the fold.
fn pick_first_best<V, I, F>(candidates: I, improves: F) -> Result<Option<(V, Action)>, AgentError>
where
    I: IntoIterator<Item = Result<(Action, V), AgentError>>,
    F: Fn(&V, &V) -> bool,
{
    let mut best: Option<(V, Action)> = None;
    for candidate in candidates {
        let (action, value) = candidate?;
        let replace = match &best {
            None => true,
            Some((current, _)) => improves(&value, current),
        };
        if replace {
            best = Some((value, action));
        }
    }
    Ok(best)
}

/// MaxN backward induction.
///
/// Leaf (depth 0 or goal state) values are the full score vector. At inner
/// nodes the player to move maximizes only its own component.
///
/// # Returns
/// * `(scores, action)` - Backed-up score vector and the chosen action, if any
pub fn max_n(
    state: &BoardState,
    depth: u32,
    ctx: &SearchContext,
) -> Result<(Vec<u32>, Option<Action>), AgentError> {
    max_n_node(state, depth, ctx, false)
}

fn max_n_node(
    state: &BoardState,
    depth: u32,
    ctx: &SearchContext,
    parallel: bool,
) -> Result<(Vec<u32>, Option<Action>), AgentError> {
    if depth == 0 || state.is_goal_state() {
        return Ok((state.score_vector(), None));
    }

    let actions = state.legal_actions();
    if actions.is_empty() {
        return Ok((state.score_vector(), None));
    }

    let player = state.active_player().index();
    let expand = |action: &Action| -> Result<(Action, Vec<u32>), AgentError> {
        ctx.check()?;
        let child = state.generate_successor(action)?;
        let (scores, _) = max_n_node(&child, depth - 1, ctx, false)?;
        Ok((*action, scores))
    };
    let improves = |candidate: &Vec<u32>, current: &Vec<u32>| candidate[player] > current[player];

    let best = if parallel {
        let children: Vec<_> = actions.par_iter().map(expand).collect();
        pick_first_best(children, improves)?
    } else {
        pick_first_best(actions.iter().map(expand), improves)?
    };

    Ok(match best {
        Some((scores, action)) => (scores, Some(action)),
        None => (state.score_vector(), None),
    })
}

/// Leaf evaluation for Minimax: `player`'s score minus the score of the
/// first other player in the state's score order. With a single player
/// there is no adversary.
pub fn evaluate(state: &BoardState, player: PlayerId) -> i64 {
    let own = state.score(player) as i64;
    match state.score_order().iter().copied().find(|&p| p != player) {
        Some(opponent) => own - state.score(opponent) as i64,
        None => own,
    }
}

/// Two-role minimax from `player`'s point of view.
///
/// Nodes where `player` moves maximize `evaluate`, every other node minimizes
/// it; with three or more players all opponents share that minimizing role.
pub fn minimax(
    state: &BoardState,
    depth: u32,
    player: PlayerId,
    ctx: &SearchContext,
) -> Result<(i64, Option<Action>), AgentError> {
    minimax_node(state, depth, player, ctx, false)
}

fn minimax_node(
    state: &BoardState,
    depth: u32,
    player: PlayerId,
    ctx: &SearchContext,
    parallel: bool,
) -> Result<(i64, Option<Action>), AgentError> {
    if depth == 0 || state.is_goal_state() {
        return Ok((evaluate(state, player), None));
    }

    let actions = state.legal_actions();
    if actions.is_empty() {
        return Ok((evaluate(state, player), None));
    }

    let maximizing = state.active_player() == player;
    let expand = |action: &Action| -> Result<(Action, i64), AgentError> {
        ctx.check()?;
        let child = state.generate_successor(action)?;
        let (value, _) = minimax_node(&child, depth - 1, player, ctx, false)?;
        Ok((*action, value))
    };
    let improves = |candidate: &i64, current: &i64| {
        if maximizing {
            candidate > current
        } else {
            candidate < current
        }
    };

    let best = if parallel {
        let children: Vec<_> = actions.par_iter().map(expand).collect();
        pick_first_best(children, improves)?
    } else {
        pick_first_best(actions.iter().map(expand), improves)?
    };

    Ok(match best {
        Some((value, action)) => (value, Some(action)),
        None => (evaluate(state, player), None),
    })
}

/// Agent driving `max_n` from the current state
pub struct MaxNAgent {
    id: AgentId,
    think_delay: Duration,
    parallel_root: bool,
}

impl MaxNAgent {
    pub fn new(id: AgentId, think_delay: Duration, parallel_root: bool) -> Self {
        MaxNAgent {
            id,
            think_delay,
            parallel_root,
        }
    }
}

impl Agent for MaxNAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::MaxN
    }

    fn choose_action(
        &self,
        state: &BoardState,
        max_depth: u32,
        ctx: &SearchContext,
    ) -> Result<Action, AgentError> {
        ctx.pause(self.think_delay)?;
        let (scores, action) = max_n_node(state, max_depth, ctx, self.parallel_root)?;
        debug!(
            "MaxN {} depth {}: scores {:?}, {} nodes",
            self.id,
            max_depth,
            scores,
            ctx.nodes()
        );
        action.ok_or(AgentError::NoLegalActions)
    }
}

/// Agent driving `minimax` for the player to move
pub struct MinimaxAgent {
    id: AgentId,
    think_delay: Duration,
    parallel_root: bool,
}

impl MinimaxAgent {
    pub fn new(id: AgentId, think_delay: Duration, parallel_root: bool) -> Self {
        MinimaxAgent {
            id,
            think_delay,
            parallel_root,
        }
    }
}

impl Agent for MinimaxAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Minimax
    }

    fn choose_action(
        &self,
        state: &BoardState,
        max_depth: u32,
        ctx: &SearchContext,
    ) -> Result<Action, AgentError> {
        ctx.pause(self.think_delay)?;
        let player = state.active_player();
        let (value, action) = minimax_node(state, max_depth, player, ctx, self.parallel_root)?;
        debug!(
            "Minimax {} depth {}: value {}, {} nodes",
            self.id,
            max_depth,
            value,
            ctx.nodes()
        );
        action.ok_or(AgentError::NoLegalActions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::parse_map;
    use crate::types::Coord;

    fn player(index: usize) -> PlayerId {
        PlayerId::new(index).unwrap()
    }

    #[test]
    fn test_depth_zero_returns_leaf_scores() {
        let state = parse_map("A__\n__B", 3).unwrap();
        let ctx = SearchContext::unbounded();
        assert_eq!(max_n(&state, 0, &ctx).unwrap(), (vec![1, 1], None));
        assert_eq!(minimax(&state, 0, player(0), &ctx).unwrap(), (0, None));
        assert_eq!(ctx.nodes(), 0);
    }

    #[test]
    fn test_max_n_one_ply_takes_longest_paint() {
        let state = parse_map("A___\n___B", 3).unwrap();
        let ctx = SearchContext::unbounded();
        let (scores, action) = max_n(&state, 1, &ctx).unwrap();
        assert_eq!(action, Some(Action::new(Coord::new(0, 0), Coord::new(0, 3))));
        assert_eq!(scores, vec![4, 1]);
    }

    #[test]
    fn test_minimax_leaf_uses_first_other_player() {
        let state = parse_map("Aaa_\nbB__\ncC__", 3).unwrap();
        // A: 3, B: 2, C: 2
        assert_eq!(evaluate(&state, player(0)), 1);
        // B's adversary is A, the first other player in map order
        assert_eq!(evaluate(&state, player(1)), -1);
        assert_eq!(evaluate(&state, player(2)), -1);
    }

    #[test]
    fn test_minimax_adversary_follows_map_appearance() {
        // letters appear as A, C, B; scores A: 2, C: 3, B: 4
        let state = parse_map("Aa__\nCcc_\nBbbb", 3).unwrap();
        assert_eq!(evaluate(&state, player(0)), -1);
        assert_eq!(evaluate(&state, player(2)), 1);
        assert_eq!(evaluate(&state, player(1)), 2);
    }

    #[test]
    fn test_single_player_evaluation_is_own_score() {
        let state = parse_map("A__", 3).unwrap();
        assert_eq!(evaluate(&state, player(0)), 1);
    }

    #[test]
    fn test_parallel_root_matches_sequential() {
        let state = parse_map("A_0__\n_____\n__0_B", 4).unwrap();
        let ctx = SearchContext::unbounded();
        for depth in 1..=3 {
            let sequential = max_n_node(&state, depth, &ctx, false).unwrap();
            let parallel = max_n_node(&state, depth, &ctx, true).unwrap();
            assert_eq!(sequential, parallel, "MaxN depth {}", depth);

            let sequential = minimax_node(&state, depth, player(0), &ctx, false).unwrap();
            let parallel = minimax_node(&state, depth, player(0), &ctx, true).unwrap();
            assert_eq!(sequential, parallel, "Minimax depth {}", depth);
        }
    }

    #[test]
    fn test_cancelled_search_unwinds() {
        let state = parse_map("A___\n___B", 3).unwrap();
        let token = crate::agents::CancelToken::new();
        token.cancel();
        let ctx = SearchContext::new(token);
        assert_eq!(max_n(&state, 3, &ctx), Err(AgentError::Cancelled));
        assert_eq!(
            minimax(&state, 3, player(0), &ctx),
            Err(AgentError::Cancelled)
        );
    }
}
