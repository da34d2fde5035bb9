// Bit-packed game state: ship positions, painted cells and abyss obstacles
//
// STATE LAYOUT
// For a 6 x 7 board every mask carries 42 bits, one per cell, row-major:
//
//  0   1   2   3   4   5   6 | row 0
//  7   8   9  10  11  12  13 | row 1
// 14  15  16  17  18  19  20 | row 2
// ...
//
// Each player owns a single-bit ship mask and a painted mask; obstacles are a
// shared mask fixed for the whole game. States are never mutated once built:
// a move derives a fresh state through `generate_successor`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::bitmask::Bitmask;
use crate::map::MapFormatError;
use crate::types::{Action, Coord, Direction, PlayerId, MAX_PLAYERS};

/// Board dimensions, fixed at game start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub rows: usize,
    pub cols: usize,
}

impl Geometry {
    pub fn new(rows: usize, cols: usize) -> Self {
        Geometry { rows, cols }
    }

    /// Number of cells, which is also the width of every mask
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn index(&self, coord: Coord) -> usize {
        coord.row * self.cols + coord.col
    }

    #[inline]
    pub fn coord(&self, index: usize) -> Coord {
        Coord::new(index / self.cols, index % self.cols)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    /// The neighbouring cell in `direction`, or None at the board edge
    pub fn step(&self, from: Coord, direction: Direction) -> Option<Coord> {
        let (dr, dc) = direction.delta();
        let row = from.row.checked_add_signed(dr)?;
        let col = from.col.checked_add_signed(dc)?;
        let next = Coord::new(row, col);
        if self.contains(next) {
            Some(next)
        } else {
            None
        }
    }
}

/// Raised when a transition is requested that the rules do not allow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IllegalActionError {
    /// The state is already a goal state
    TerminalState { round: u32 },
    /// The action is not among the active player's legal actions
    NotLegal { player: PlayerId, action: Action },
}

impl fmt::Display for IllegalActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalActionError::TerminalState { round } => {
                write!(f, "state is goal (round {}), no further moves allowed", round)
            }
            IllegalActionError::NotLegal { player, action } => {
                write!(f, "illegal action {} for player {}", action, player)
            }
        }
    }
}

impl std::error::Error for IllegalActionError {}

/// Immutable snapshot of the game between two moves
#[derive(Debug, Clone)]
pub struct BoardState {
    geometry: Geometry,
    ship_positions: Vec<Bitmask>,
    painted: Vec<Bitmask>,
    obstacles: Arc<Bitmask>,
    /// Players in the order their letters first appear on the map
    score_order: Arc<[PlayerId]>,
    active_player: usize,
    current_round: u32,
    max_rounds: u32,
    /// Legal actions of `active_player` in this exact state, filled on first use
    legal_actions: OnceLock<Vec<Action>>,
}

impl BoardState {
    /// Builds the initial state (round 0, player A to move).
    ///
    /// # Arguments
    /// * `geometry` - Board dimensions
    /// * `ship_positions` - One single-bit mask per player, in player order
    /// * `painted` - One painted mask per player, in player order
    /// * `obstacles` - Abyss cells
    /// * `max_rounds` - Round limit
    ///
    /// # Returns
    /// * `Err(MapFormatError)` if the masks break a board invariant
    pub fn new(
        geometry: Geometry,
        ship_positions: Vec<Bitmask>,
        painted: Vec<Bitmask>,
        obstacles: Bitmask,
        max_rounds: u32,
    ) -> Result<Self, MapFormatError> {
        let cells = geometry.cells();
        let players = ship_positions.len();

        if players == 0 {
            return Err(MapFormatError::NoShips);
        }
        if players > MAX_PLAYERS {
            return Err(MapFormatError::TooManyShips {
                found: players,
                max: MAX_PLAYERS,
            });
        }
        if painted.len() != players {
            return Err(MapFormatError::Inconsistent(format!(
                "{} ships but {} painted masks",
                players,
                painted.len()
            )));
        }
        if ship_positions
            .iter()
            .chain(painted.iter())
            .chain(std::iter::once(&obstacles))
            .any(|m| m.len() != cells)
        {
            return Err(MapFormatError::Inconsistent(format!(
                "every mask must have {} bits",
                cells
            )));
        }

        let mut occupied = obstacles.clone();
        for (index, ship) in ship_positions.iter().enumerate() {
            if ship.count_ones() != 1 || !ship.is_disjoint(&occupied) {
                return Err(MapFormatError::Inconsistent(format!(
                    "ship {} must occupy exactly one free cell",
                    PlayerId::new(index).map(|p| p.ship_symbol()).unwrap_or('?')
                )));
            }
            occupied |= ship;
        }

        let mut claimed = obstacles.clone();
        for mask in painted.iter() {
            if !mask.is_disjoint(&claimed) {
                return Err(MapFormatError::Inconsistent(
                    "painted cells must have one owner and never lie on an obstacle".to_string(),
                ));
            }
            claimed |= mask;
        }

        let score_order = (0..players).filter_map(PlayerId::new).collect();
        Ok(Self::from_parts(
            geometry,
            ship_positions,
            painted,
            Arc::new(obstacles),
            score_order,
            0,
            0,
            max_rounds,
        ))
    }

    /// Replaces the ordinal score order with `order`, which must list every
    /// player exactly once.
    pub fn with_score_order(mut self, order: Vec<PlayerId>) -> Result<Self, MapFormatError> {
        let mut sorted = order.clone();
        sorted.sort();
        if !sorted.iter().copied().eq(self.players()) {
            return Err(MapFormatError::Inconsistent(format!(
                "score order must list each of the {} players once",
                self.num_players()
            )));
        }
        self.score_order = Arc::from(order);
        Ok(self)
    }

    /// Assembles a state from owned parts with an empty legal-action cache
    fn from_parts(
        geometry: Geometry,
        ship_positions: Vec<Bitmask>,
        painted: Vec<Bitmask>,
        obstacles: Arc<Bitmask>,
        score_order: Arc<[PlayerId]>,
        active_player: usize,
        current_round: u32,
        max_rounds: u32,
    ) -> Self {
        BoardState {
            geometry,
            ship_positions,
            painted,
            obstacles,
            score_order,
            active_player,
            current_round,
            max_rounds,
            legal_actions: OnceLock::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.geometry.rows
    }

    pub fn cols(&self) -> usize {
        self.geometry.cols
    }

    pub fn num_players(&self) -> usize {
        self.ship_positions.len()
    }

    /// All players in ordinal order
    pub fn players(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.num_players()).filter_map(PlayerId::new)
    }

    pub fn active_player(&self) -> PlayerId {
        PlayerId::new(self.active_player).expect("player count is bounded by MAX_PLAYERS")
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn obstacles(&self) -> &Bitmask {
        &self.obstacles
    }

    pub fn ship_mask(&self, player: PlayerId) -> &Bitmask {
        &self.ship_positions[player.index()]
    }

    pub fn painted_mask(&self, player: PlayerId) -> &Bitmask {
        &self.painted[player.index()]
    }

    /// Cell currently occupied by the player's ship
    pub fn ship_position(&self, player: PlayerId) -> Coord {
        let index = self.ship_positions[player.index()]
            .first_one()
            .expect("every ship mask holds exactly one bit");
        self.geometry.coord(index)
    }

    /// Union of every ship, painted and obstacle mask
    pub fn occupancy(&self) -> Bitmask {
        let mut union = (*self.obstacles).clone();
        for mask in self.ship_positions.iter().chain(self.painted.iter()) {
            union |= mask;
        }
        union
    }

    /// True once the board is fully covered or the round limit is reached
    pub fn is_goal_state(&self) -> bool {
        self.current_round >= self.max_rounds || self.occupancy().is_full()
    }

    /// Number of cells painted in the player's color
    pub fn score(&self, player: PlayerId) -> u32 {
        self.painted[player.index()].count_ones() as u32
    }

    /// Scores of all players keyed by player
    pub fn scores(&self) -> BTreeMap<PlayerId, u32> {
        self.players().map(|p| (p, self.score(p))).collect()
    }

    /// Players in the order their letters first appear on the map, row by row.
    /// States built directly with `new` use ordinal order.
    pub fn score_order(&self) -> &[PlayerId] {
        &self.score_order
    }

    /// Scores of all players indexed by ordinal
    pub fn score_vector(&self) -> Vec<u32> {
        self.painted.iter().map(|m| m.count_ones() as u32).collect()
    }

    /// Legal actions of the active player, empty in a goal state.
    ///
    /// Order: for up, right, down, left the farthest reachable cell, followed by
    /// the single-step move when the farthest cell is more than one step away;
    /// the stay action comes last.
    pub fn legal_actions(&self) -> &[Action] {
        if self.is_goal_state() {
            return &[];
        }
        self.legal_actions.get_or_init(|| self.compute_legal_actions())
    }

    fn compute_legal_actions(&self) -> Vec<Action> {
        let player = self.active_player;
        let source = self.ship_position(self.active_player());

        let mut blocked = (*self.obstacles).clone();
        for (owner, ship) in self.ship_positions.iter().enumerate() {
            if owner != player {
                blocked |= ship;
            }
        }

        let mut actions = Vec::with_capacity(9);
        for direction in Direction::all() {
            let mut farthest = source;
            let mut distance = 0usize;
            while let Some(next) = self.geometry.step(farthest, direction) {
                if blocked.contains(self.geometry.index(next)) {
                    break;
                }
                farthest = next;
                distance += 1;
            }

            if distance == 0 {
                continue;
            }
            actions.push(Action::new(source, farthest));
            if distance > 1 {
                if let Some(one_step) = self.geometry.step(source, direction) {
                    actions.push(Action::new(source, one_step));
                }
            }
        }

        actions.push(Action::stay(source));
        actions
    }

    /// Applies `action` for the active player and returns the resulting state.
    /// `self` is left untouched.
    ///
    /// # Returns
    /// * `Err(IllegalActionError)` if the state is terminal or the action is not legal
    pub fn generate_successor(&self, action: &Action) -> Result<BoardState, IllegalActionError> {
        if self.is_goal_state() {
            return Err(IllegalActionError::TerminalState {
                round: self.current_round,
            });
        }
        if !self.legal_actions().contains(action) {
            return Err(IllegalActionError::NotLegal {
                player: self.active_player(),
                action: *action,
            });
        }

        let player = self.active_player;

        let mut ship_positions = self.ship_positions.clone();
        ship_positions[player].remove(self.geometry.index(action.source));
        ship_positions[player].insert(self.geometry.index(action.destination));

        let mut painted = self.painted.clone();
        for cell in action.path() {
            let index = self.geometry.index(cell);
            for (owner, mask) in painted.iter_mut().enumerate() {
                if owner == player {
                    mask.insert(index);
                } else {
                    mask.remove(index);
                }
            }
        }

        let next_player = (player + 1) % self.num_players();
        let next_round = if next_player == 0 {
            self.current_round + 1
        } else {
            self.current_round
        };

        Ok(Self::from_parts(
            self.geometry,
            ship_positions,
            painted,
            Arc::clone(&self.obstacles),
            Arc::clone(&self.score_order),
            next_player,
            next_round,
            self.max_rounds,
        ))
    }

    /// Symbol shown for a cell: ship letter, paint letter, `0` or `_`
    pub fn symbol_at(&self, coord: Coord) -> char {
        let index = self.geometry.index(coord);
        for player in self.players() {
            if self.ship_positions[player.index()].contains(index) {
                return player.ship_symbol();
            }
        }
        for player in self.players() {
            if self.painted[player.index()].contains(index) {
                return player.paint_symbol();
            }
        }
        if self.obstacles.contains(index) {
            '0'
        } else {
            '_'
        }
    }

    /// Human-readable grid, one line per row, cells separated by spaces
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = (0..self.cols())
                .map(|col| self.symbol_at(Coord::new(row, col)).to_string())
                .collect();
            write!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Equality over the game-relevant fields; the legal-action cache is ignored.
impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.geometry == other.geometry
            && self.ship_positions == other.ship_positions
            && self.painted == other.painted
            && self.obstacles == other.obstacles
            && self.score_order == other.score_order
            && self.active_player == other.active_player
            && self.current_round == other.current_round
            && self.max_rounds == other.max_rounds
    }
}

impl Eq for BoardState {}
