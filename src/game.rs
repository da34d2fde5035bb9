// Headless game session
//
// Drives a game from the initial state to a goal state: asks the executor for
// the active player's decision, logs the move and applies the transition.
// Any failure is logged as an ERROR line and ends the session; nothing is retried.

use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::{build_roster, Agent, AgentIdGenerator, AgentKind, RosterError};
use crate::board::{BoardState, IllegalActionError};
use crate::config::Config;
use crate::executor::{BoundedExecutor, DecisionError};
use crate::game_log::GameLog;
use crate::map::{load_map, MapFormatError};
use crate::types::{format_actions, Action, PlayerId};

/// Every way a session can fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    Config(String),
    Map(MapFormatError),
    Roster(RosterError),
    IllegalAction(IllegalActionError),
    Decision(DecisionError),
    Log(String),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Config(message) => write!(f, "configuration error: {}", message),
            GameError::Map(e) => write!(f, "map error: {}", e),
            GameError::Roster(e) => write!(f, "agent roster error: {}", e),
            GameError::IllegalAction(e) => write!(f, "illegal action: {}", e),
            GameError::Decision(e) => write!(f, "{}", e),
            GameError::Log(message) => write!(f, "log error: {}", message),
        }
    }
}

impl std::error::Error for GameError {}

impl From<MapFormatError> for GameError {
    fn from(e: MapFormatError) -> Self {
        GameError::Map(e)
    }
}

impl From<RosterError> for GameError {
    fn from(e: RosterError) -> Self {
        GameError::Roster(e)
    }
}

impl From<IllegalActionError> for GameError {
    fn from(e: IllegalActionError) -> Self {
        GameError::IllegalAction(e)
    }
}

impl From<DecisionError> for GameError {
    fn from(e: DecisionError) -> Self {
        GameError::Decision(e)
    }
}

/// One completed move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRecord {
    /// Zero-based round in which the move was made
    pub round: u32,
    pub player: PlayerId,
    pub agent: AgentKind,
    pub action: Action,
    pub legal_actions: Vec<Action>,
    pub think_time: Duration,
    pub nodes: u64,
}

/// Result of a finished game
#[derive(Debug, Clone)]
pub struct GameSummary {
    pub final_state: BoardState,
    pub moves: Vec<MoveRecord>,
}

impl GameSummary {
    pub fn scores(&self) -> BTreeMap<PlayerId, u32> {
        self.final_state.scores()
    }

    /// Players sharing the highest score
    pub fn leaders(&self) -> Vec<PlayerId> {
        let scores = self.scores();
        let best = scores.values().copied().max().unwrap_or(0);
        scores
            .into_iter()
            .filter(|&(_, score)| score == best)
            .map(|(player, _)| player)
            .collect()
    }
}

/// A game in progress
pub struct Session {
    state: Arc<BoardState>,
    agents: Vec<Arc<dyn Agent>>,
    executor: BoundedExecutor,
    max_depth: u32,
    log: GameLog,
    history: Vec<MoveRecord>,
}

impl Session {
    /// # Arguments
    /// * `state` - Initial state
    /// * `agents` - One agent per player, in player order
    /// * `executor` - Deadline policy for decisions
    /// * `max_depth` - Depth budget handed to every decision
    /// * `log` - Move log sink
    pub fn new(
        state: BoardState,
        agents: Vec<Arc<dyn Agent>>,
        executor: BoundedExecutor,
        max_depth: u32,
        log: GameLog,
    ) -> Result<Self, GameError> {
        if agents.len() != state.num_players() {
            return Err(GameError::Config(format!(
                "{} agents for {} players",
                agents.len(),
                state.num_players()
            )));
        }
        Ok(Session {
            state: Arc::new(state),
            agents,
            executor,
            max_depth,
            log,
            history: Vec::new(),
        })
    }

    /// Loads the map, builds the roster and opens the log described by `config`
    pub async fn from_config(config: &Config) -> Result<Self, GameError> {
        config.validate().map_err(GameError::Config)?;
        let session = &config.session;

        let state = load_map(&session.maps_folder, &session.map, session.max_rounds)?;

        let mut ids = AgentIdGenerator::new();
        let agents = build_roster(
            &config.agents.roster,
            state.num_players(),
            config.agents.max_players,
            &mut ids,
            &config.agent_options(),
        )?;

        let executor = BoundedExecutor::from_secs(
            session.max_think_time_secs,
            config.timing.polling_interval(),
        );

        let log = if config.logging.enabled {
            GameLog::create(&config.logging.log_folder, session.verbose)
                .await
                .map_err(GameError::Log)?
        } else {
            GameLog::disabled(session.verbose)
        };

        info!(
            "Session ready: map {}, {} players, agents [{}], budget {:?}, depth {}",
            session.map,
            state.num_players(),
            agents
                .iter()
                .map(|a| a.kind().as_str())
                .collect::<Vec<_>>()
                .join(", "),
            executor.budget(),
            session.max_depth
        );

        Session::new(state, agents, executor, session.max_depth, log)
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn log(&self) -> &GameLog {
        &self.log
    }

    /// Obtains and applies the active player's next move.
    ///
    /// `on_poll` runs while the agent is thinking with the state being decided
    /// and the time elapsed so far.
    pub async fn play_turn<F>(&mut self, mut on_poll: F) -> Result<MoveRecord, GameError>
    where
        F: FnMut(&BoardState, Duration),
    {
        let state = Arc::clone(&self.state);
        let player = state.active_player();
        let agent = Arc::clone(&self.agents[player.index()]);

        let poll_state = Arc::clone(&state);
        let decision = self
            .executor
            .run_with_deadline(
                Arc::clone(&agent),
                Arc::clone(&state),
                self.max_depth,
                |elapsed| on_poll(&poll_state, elapsed),
            )
            .await?;

        let record = MoveRecord {
            round: state.current_round(),
            player,
            agent: agent.kind(),
            action: decision.action,
            legal_actions: state.legal_actions().to_vec(),
            think_time: decision.elapsed,
            nodes: decision.nodes,
        };
        self.log.info(&Self::describe_move(&state, &record)).await;
        debug!(
            "{} ({}) moved {} cells, {} nodes searched",
            record.player,
            agent.id(),
            record.action.cost(),
            record.nodes
        );

        let next = state.generate_successor(&decision.action)?;
        self.state = Arc::new(next);
        self.history.push(record.clone());
        Ok(record)
    }

    fn describe_move(state: &BoardState, record: &MoveRecord) -> String {
        format!(
            "\nRound {} / {}\nIn state\n{}\nagent {} chose action {} from actions {}\nThink time was {:.2} seconds.\n",
            record.round + 1,
            state.max_rounds(),
            state,
            record.player,
            record.action,
            format_actions(&record.legal_actions),
            record.think_time.as_secs_f64()
        )
    }

    /// Plays until a goal state, without a poll hook
    pub async fn run(self) -> Result<GameSummary, GameError> {
        self.run_with_hook(|_, _| {}).await
    }

    /// Plays until a goal state, calling `hook` between executor polls.
    /// The log is closed whether the game finishes or aborts.
    pub async fn run_with_hook<F>(mut self, mut hook: F) -> Result<GameSummary, GameError>
    where
        F: FnMut(&BoardState, Duration),
    {
        self.log.info("Starting simulation ...").await;

        loop {
            if self.state.is_goal_state() {
                self.log
                    .info(&format!("\nFinal state\n{}", self.state))
                    .await;
                break;
            }

            if let Err(e) = self.play_turn(&mut hook).await {
                self.log.error(&e.to_string()).await;
                self.log.close().await;
                return Err(e);
            }
        }

        self.log.close().await;
        Ok(GameSummary {
            final_state: (*self.state).clone(),
            moves: self.history,
        })
    }
}
