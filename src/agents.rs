// Decision agents and the registry that builds them from configured names
//
// Every agent implements `Agent::choose_action`. Search agents receive a
// `SearchContext` and must call `check()` before expanding a child so that a
// cancelled decision unwinds promptly with `AgentError::Cancelled`.

use log::debug;
use rand::seq::IndexedRandom;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::{BoardState, IllegalActionError};
use crate::search::{MaxNAgent, MinimaxAgent};
use crate::types::Action;

/// Granularity of cancellation checks while an agent pauses
const PAUSE_SLICE: Duration = Duration::from_millis(5);

/// Errors an agent can raise while choosing an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The decision was cancelled before it finished
    Cancelled,
    /// The state offered no legal action
    NoLegalActions,
    /// A successor was requested with an action the state rejected
    IllegalAction(IllegalActionError),
    /// Any other failure
    Unexpected(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Cancelled => write!(f, "decision cancelled"),
            AgentError::NoLegalActions => write!(f, "no legal actions available"),
            AgentError::IllegalAction(e) => write!(f, "{}", e),
            AgentError::Unexpected(message) => write!(f, "unexpected agent error: {}", message),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<IllegalActionError> for AgentError {
    fn from(e: IllegalActionError) -> Self {
        AgentError::IllegalAction(e)
    }
}

/// Cooperative cancellation flag shared between the executor and a running decision
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-decision search bookkeeping: cancellation and expanded-node count
#[derive(Debug, Default)]
pub struct SearchContext {
    token: CancelToken,
    nodes: AtomicU64,
}

impl SearchContext {
    pub fn new(token: CancelToken) -> Self {
        SearchContext {
            token,
            nodes: AtomicU64::new(0),
        }
    }

    /// Context that is never cancelled, for direct calls outside the executor
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Records one node expansion; fails if the decision was cancelled
    #[inline]
    pub fn check(&self) -> Result<(), AgentError> {
        if self.token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        self.nodes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of nodes expanded so far
    pub fn nodes(&self) -> u64 {
        self.nodes.load(Ordering::Relaxed)
    }

    /// Sleeps for `duration`, waking early with `Cancelled` if the token fires
    pub fn pause(&self, duration: Duration) -> Result<(), AgentError> {
        let until = Instant::now() + duration;
        loop {
            if self.token.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            std::thread::sleep(PAUSE_SLICE.min(until - now));
        }
    }
}

/// Session-scoped agent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues sequential agent ids; owned by whoever builds the agents
#[derive(Debug, Default)]
pub struct AgentIdGenerator {
    next: u32,
}

impl AgentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

/// A move-selection strategy
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    fn kind(&self) -> AgentKind;

    /// Picks one of `state.legal_actions()`.
    ///
    /// # Arguments
    /// * `state` - Non-terminal state in which the agent's player is to move
    /// * `max_depth` - Search depth budget in plies (ignored by non-search agents)
    /// * `ctx` - Cancellation and node accounting for this decision
    fn choose_action(
        &self,
        state: &BoardState,
        max_depth: u32,
        ctx: &SearchContext,
    ) -> Result<Action, AgentError>;
}

/// Strategy tags known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    Random,
    Greedy,
    MaxN,
    Minimax,
}

impl AgentKind {
    pub fn all() -> [AgentKind; 4] {
        [
            AgentKind::Random,
            AgentKind::Greedy,
            AgentKind::MaxN,
            AgentKind::Minimax,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Random => "RandomAgent",
            AgentKind::Greedy => "GreedyAgent",
            AgentKind::MaxN => "MaxNAgent",
            AgentKind::Minimax => "MinimaxAgent",
        }
    }

    /// Constructs the agent for this kind
    pub fn build(self, id: AgentId, options: &AgentOptions) -> Arc<dyn Agent> {
        match self {
            AgentKind::Random => Arc::new(RandomAgent::new(id, options.think_delay)),
            AgentKind::Greedy => Arc::new(GreedyAgent::new(id, options.think_delay)),
            AgentKind::MaxN => Arc::new(MaxNAgent::new(
                id,
                options.think_delay,
                options.parallel_root,
            )),
            AgentKind::Minimax => Arc::new(MinimaxAgent::new(
                id,
                options.think_delay,
                options.parallel_root,
            )),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = RosterError;

    /// Accepts the class-style names (`MaxNAgent`) and short names (`maxn`), case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let short = name.strip_suffix("agent").unwrap_or(&name);
        match short {
            "random" => Ok(AgentKind::Random),
            "greedy" => Ok(AgentKind::Greedy),
            "maxn" => Ok(AgentKind::MaxN),
            "minimax" => Ok(AgentKind::Minimax),
            _ => Err(RosterError::UnknownAgent(s.trim().to_string())),
        }
    }
}

/// Construction parameters shared by every agent of a session
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    /// Pause before each decision, counted against the decision deadline
    pub think_delay: Duration,
    /// Evaluate root children on the rayon pool (MaxN and Minimax only)
    pub parallel_root: bool,
}

/// Errors raised while mapping configured agent names to players
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    Empty,
    TooManyAgents { given: usize, max: usize },
    UnknownAgent(String),
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterError::Empty => write!(f, "no agents configured"),
            RosterError::TooManyAgents { given, max } => {
                write!(f, "too many agents: {} given, at most {} allowed", given, max)
            }
            RosterError::UnknownAgent(name) => {
                let known: Vec<&str> = AgentKind::all().iter().map(|k| k.as_str()).collect();
                write!(f, "unknown agent '{}' (known: {})", name, known.join(", "))
            }
        }
    }
}

impl std::error::Error for RosterError {}

/// Resolves one agent kind per player.
///
/// Every name is validated up front. Extra names beyond `num_players` are
/// dropped and the last name is recycled when fewer names than players are given.
pub fn resolve_roster(
    names: &[String],
    num_players: usize,
    max_players: usize,
) -> Result<Vec<AgentKind>, RosterError> {
    if names.len() > max_players {
        return Err(RosterError::TooManyAgents {
            given: names.len(),
            max: max_players,
        });
    }

    let kinds = names
        .iter()
        .map(|n| n.parse::<AgentKind>())
        .collect::<Result<Vec<_>, _>>()?;
    let last = *kinds.last().ok_or(RosterError::Empty)?;

    Ok((0..num_players)
        .map(|i| kinds.get(i).copied().unwrap_or(last))
        .collect())
}

/// Builds the agents for a session, one per player, in player order
pub fn build_roster(
    names: &[String],
    num_players: usize,
    max_players: usize,
    ids: &mut AgentIdGenerator,
    options: &AgentOptions,
) -> Result<Vec<Arc<dyn Agent>>, RosterError> {
    let kinds = resolve_roster(names, num_players, max_players)?;
    Ok(kinds
        .into_iter()
        .map(|kind| {
            let agent = kind.build(ids.issue(), options);
            debug!("Built {} {}", agent.kind(), agent.id());
            agent
        })
        .collect())
}

/// Picks a uniformly random legal action
pub struct RandomAgent {
    id: AgentId,
    think_delay: Duration,
}

impl RandomAgent {
    pub fn new(id: AgentId, think_delay: Duration) -> Self {
        RandomAgent { id, think_delay }
    }
}

impl Agent for RandomAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Random
    }

    fn choose_action(
        &self,
        state: &BoardState,
        _max_depth: u32,
        ctx: &SearchContext,
    ) -> Result<Action, AgentError> {
        ctx.pause(self.think_delay)?;
        state
            .legal_actions()
            .choose(&mut rand::rng())
            .copied()
            .ok_or(AgentError::NoLegalActions)
    }
}

/// Picks the action maximizing the mover's score one ply ahead.
/// Ties keep the first action in legal-action order.
pub struct GreedyAgent {
    id: AgentId,
    think_delay: Duration,
}

impl GreedyAgent {
    pub fn new(id: AgentId, think_delay: Duration) -> Self {
        GreedyAgent { id, think_delay }
    }
}

impl Agent for GreedyAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Greedy
    }

    fn choose_action(
        &self,
        state: &BoardState,
        _max_depth: u32,
        ctx: &SearchContext,
    ) -> Result<Action, AgentError> {
        ctx.pause(self.think_delay)?;
        let player = state.active_player();

        let mut best: Option<(u32, Action)> = None;
        for action in state.legal_actions() {
            ctx.check()?;
            let score = state.generate_successor(action)?.score(player);
            let improves = match best {
                None => true,
                Some((best_score, _)) => score > best_score,
            };
            if improves {
                best = Some((score, *action));
            }
        }

        best.map(|(_, action)| action)
            .ok_or(AgentError::NoLegalActions)
    }
}
