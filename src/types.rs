// Value types shared by the board, the agents and the session loop
// Coordinates are (row, col) with rows growing downwards and columns to the right.

use std::fmt;

/// Maximum number of ships a map may declare (letters A through D)
pub const MAX_PLAYERS: usize = 4;

/// Ordinal of a player; player `i` flies ship letter `'A' + i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(u8);

impl PlayerId {
    /// Returns the player with the given ordinal, if it is within `MAX_PLAYERS`
    pub fn new(index: usize) -> Option<Self> {
        if index < MAX_PLAYERS {
            Some(PlayerId(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Uppercase letter used for this player's ship
    pub fn ship_symbol(self) -> char {
        (b'A' + self.0) as char
    }

    /// Lowercase letter used for cells painted in this player's color
    pub fn paint_symbol(self) -> char {
        (b'a' + self.0) as char
    }

    pub fn from_ship_symbol(symbol: char) -> Option<Self> {
        if symbol.is_ascii_uppercase() {
            Self::new((symbol as u8 - b'A') as usize)
        } else {
            None
        }
    }

    pub fn from_paint_symbol(symbol: char) -> Option<Self> {
        if symbol.is_ascii_lowercase() {
            Self::new((symbol as u8 - b'a') as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ship_symbol())
    }
}

/// A board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Coord { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The four axis directions a ship can travel, in move-generation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Returns all directions in the order legal moves are generated
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Right, Direction::Down, Direction::Left]
    }

    /// Row and column delta of a single step
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

/// A move from `source` to `destination` along a single row or column.
/// `source == destination` is the stay action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub source: Coord,
    pub destination: Coord,
}

impl Action {
    pub fn new(source: Coord, destination: Coord) -> Self {
        Action {
            source,
            destination,
        }
    }

    pub fn stay(at: Coord) -> Self {
        Action::new(at, at)
    }

    pub fn is_stay(&self) -> bool {
        self.source == self.destination
    }

    /// Manhattan length of the move
    pub fn cost(&self) -> usize {
        self.source.row.abs_diff(self.destination.row)
            + self.source.col.abs_diff(self.destination.col)
    }

    /// Every cell from source to destination inclusive.
    /// Legal actions are axis-aligned, so only one coordinate changes.
    pub fn path(&self) -> Vec<Coord> {
        let (src, dst) = (self.source, self.destination);
        if src.row != dst.row {
            Self::span(src.row, dst.row)
                .map(|row| Coord::new(row, src.col))
                .collect()
        } else {
            Self::span(src.col, dst.col)
                .map(|col| Coord::new(src.row, col))
                .collect()
        }
    }

    fn span(from: usize, to: usize) -> Box<dyn Iterator<Item = usize>> {
        if from <= to {
            Box::new(from..=to)
        } else {
            Box::new((to..=from).rev())
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.source, self.destination)
    }
}

/// Formats an action list as `[(a), (b), ...]` for log lines
pub fn format_actions(actions: &[Action]) -> String {
    let parts: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
