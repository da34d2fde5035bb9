// Map loading: text grid -> initial BoardState
//
// Symbols: `_` free cell, `0` abyss, `A`-`D` ships, `a`-`d` painted cells.
// Whitespace inside a line is ignored, so both `A__0` and the spaced form
// printed by `BoardState::to_display_string` are accepted.

use log::info;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::bitmask::Bitmask;
use crate::board::{BoardState, Geometry};
use crate::types::{PlayerId, MAX_PLAYERS};

const FREE_SYMBOL: char = '_';
const ABYSS_SYMBOL: char = '0';

/// Errors raised while turning a map into a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapFormatError {
    /// The map file could not be read
    Io { path: String, message: String },
    /// The map has no rows
    Empty,
    /// A cell symbol is not a recognized tile
    UnknownSymbol { symbol: char, row: usize, col: usize },
    /// A row's width differs from the first row's
    RaggedRow { row: usize, expected: usize, found: usize },
    /// The same ship letter appears more than once
    DuplicateShip(char),
    /// Ship letters must form a prefix A, B, ...; this one is missing
    MissingShip(char),
    /// Paint of a color whose ship is not on the map
    PaintWithoutShip(char),
    NoShips,
    TooManyShips { found: usize, max: usize },
    /// The masks break a board invariant
    Inconsistent(String),
}

impl fmt::Display for MapFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapFormatError::Io { path, message } => {
                write!(f, "failed to read map '{}': {}", path, message)
            }
            MapFormatError::Empty => write!(f, "map is empty"),
            MapFormatError::UnknownSymbol { symbol, row, col } => {
                write!(f, "illegal character {} in map at ({}, {})", symbol, row, col)
            }
            MapFormatError::RaggedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} cells, expected {}",
                row, found, expected
            ),
            MapFormatError::DuplicateShip(symbol) => {
                write!(f, "ship {} appears more than once", symbol)
            }
            MapFormatError::MissingShip(symbol) => {
                write!(f, "ship {} is missing, ships must be lettered from A", symbol)
            }
            MapFormatError::PaintWithoutShip(symbol) => {
                write!(f, "painted cell {} has no matching ship", symbol)
            }
            MapFormatError::NoShips => write!(f, "map has no ships"),
            MapFormatError::TooManyShips { found, max } => {
                write!(f, "map has {} ships, at most {} are supported", found, max)
            }
            MapFormatError::Inconsistent(message) => write!(f, "inconsistent map: {}", message),
        }
    }
}

impl std::error::Error for MapFormatError {}

/// Parses a map into the initial state.
/// A ship's starting cell counts as painted in its own color. The state's
/// score order follows the first appearance of each letter, row by row.
///
/// # Arguments
/// * `text` - Map rows separated by newlines
/// * `max_rounds` - Round limit for the game
pub fn parse_map(text: &str, max_rounds: u32) -> Result<BoardState, MapFormatError> {
    let rows: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    // Trailing blank lines are common in hand-edited files
    let last = rows.iter().rposition(|r| !r.is_empty()).ok_or(MapFormatError::Empty)?;
    let rows = &rows[..=last];

    let width = rows[0].len();
    for (row, cells) in rows.iter().enumerate() {
        if cells.len() != width {
            return Err(MapFormatError::RaggedRow {
                row,
                expected: width,
                found: cells.len(),
            });
        }
    }

    let geometry = Geometry::new(rows.len(), width);
    let cells = geometry.cells();

    let mut ships: Vec<Option<Bitmask>> = vec![None; MAX_PLAYERS];
    let mut painted: Vec<Bitmask> = vec![Bitmask::empty(cells); MAX_PLAYERS];
    let mut obstacles = Bitmask::empty(cells);
    // Players by first appearance of their ship or paint letter
    let mut appearance: Vec<PlayerId> = Vec::with_capacity(MAX_PLAYERS);

    for (row, line) in rows.iter().enumerate() {
        for (col, &symbol) in line.iter().enumerate() {
            let index = row * width + col;
            if symbol == FREE_SYMBOL {
                continue;
            }
            if symbol == ABYSS_SYMBOL {
                obstacles.insert(index);
            } else if let Some(player) = PlayerId::from_ship_symbol(symbol) {
                let slot = &mut ships[player.index()];
                if slot.is_some() {
                    return Err(MapFormatError::DuplicateShip(symbol));
                }
                *slot = Some(Bitmask::single(cells, index));
                painted[player.index()].insert(index);
                if !appearance.contains(&player) {
                    appearance.push(player);
                }
            } else if let Some(player) = PlayerId::from_paint_symbol(symbol) {
                painted[player.index()].insert(index);
                if !appearance.contains(&player) {
                    appearance.push(player);
                }
            } else {
                return Err(MapFormatError::UnknownSymbol { symbol, row, col });
            }
        }
    }

    let num_players = ships.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    if num_players == 0 {
        return Err(MapFormatError::NoShips);
    }

    let mut ship_positions = Vec::with_capacity(num_players);
    for (index, ship) in ships.into_iter().take(num_players).enumerate() {
        match ship {
            Some(mask) => ship_positions.push(mask),
            None => {
                let missing = PlayerId::new(index).map_or('?', |p| p.ship_symbol());
                return Err(MapFormatError::MissingShip(missing));
            }
        }
    }

    for (index, mask) in painted.iter().enumerate().skip(num_players) {
        if !mask.is_empty() {
            let symbol = PlayerId::new(index).map_or('?', |p| p.paint_symbol());
            return Err(MapFormatError::PaintWithoutShip(symbol));
        }
    }
    painted.truncate(num_players);

    BoardState::new(geometry, ship_positions, painted, obstacles, max_rounds)?
        .with_score_order(appearance)
}

/// Reads `<folder>/<name>` and parses it with `parse_map`
pub fn load_map<P: AsRef<Path>>(
    folder: P,
    name: &str,
    max_rounds: u32,
) -> Result<BoardState, MapFormatError> {
    let path = folder.as_ref().join(name);
    let text = fs::read_to_string(&path).map_err(|e| MapFormatError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let state = parse_map(&text, max_rounds)?;
    info!(
        "Loaded map {} ({}x{}, {} players)",
        path.display(),
        state.rows(),
        state.cols(),
        state.num_players()
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_layout() {
        let state = parse_map(
            "aaa0_b_\n\
             __a__b_\n\
             __A__b_\n\
             __0__b_\n\
             _____b_\n\
             ____0bB\n",
            10,
        )
        .unwrap();

        assert_eq!((state.rows(), state.cols()), (6, 7));
        assert_eq!(state.num_players(), 2);
        assert_eq!(state.obstacles().count_ones(), 3);

        let a = PlayerId::new(0).unwrap();
        let b = PlayerId::new(1).unwrap();
        assert_eq!(state.ship_mask(a).first_one(), Some(16));
        assert_eq!(state.ship_mask(b).first_one(), Some(41));
        assert_eq!(state.score(a), 5);
        assert_eq!(state.score(b), 7);
    }

    #[test]
    fn test_score_order_follows_first_appearance() {
        let id = |i| PlayerId::new(i).unwrap();

        let state = parse_map("Aa__\nCcc_\nBbbb", 3).unwrap();
        assert_eq!(state.score_order(), &[id(0), id(2), id(1)]);

        // a paint letter counts as an appearance before its ship
        let state = parse_map("b_A\n__B", 3).unwrap();
        assert_eq!(state.score_order(), &[id(1), id(0)]);
    }

    #[test]
    fn test_display_string_parses_back() {
        let text = "A _ 0\nb _ B";
        let state = parse_map(text, 3).unwrap();
        assert_eq!(state.to_display_string(), "A _ 0\nb _ B");
        assert_eq!(parse_map(&state.to_display_string(), 3).unwrap(), state);
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(
            parse_map("A_x", 5).unwrap_err(),
            MapFormatError::UnknownSymbol {
                symbol: 'x',
                row: 0,
                col: 2
            }
        );
        // E is beyond the supported ships
        assert!(matches!(
            parse_map("A_E", 5),
            Err(MapFormatError::UnknownSymbol { symbol: 'E', .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(parse_map("\n\n", 5).unwrap_err(), MapFormatError::Empty);
        assert_eq!(
            parse_map("A__\n__", 5).unwrap_err(),
            MapFormatError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(parse_map("___", 5).unwrap_err(), MapFormatError::NoShips);
        assert_eq!(
            parse_map("A_A", 5).unwrap_err(),
            MapFormatError::DuplicateShip('A')
        );
        assert_eq!(
            parse_map("A_C", 5).unwrap_err(),
            MapFormatError::MissingShip('B')
        );
        assert_eq!(
            parse_map("A_c", 5).unwrap_err(),
            MapFormatError::PaintWithoutShip('c')
        );
    }

    #[test]
    fn test_load_map_reports_missing_file() {
        let result = load_map("definitely/not/here", "nothing.txt", 5);
        assert!(matches!(result, Err(MapFormatError::Io { .. })));
    }
}
