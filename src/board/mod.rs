//! Ship-board grid - the components a match reads and mutates

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rows and columns run 0..BOARD_DIM. Row 0 is the north edge, column 0
/// the west edge; hazard impact lines are rolled inside this range.
pub const BOARD_DIM: i8 = 11;

/// Cardinal direction a hazard arrives from (or a component faces)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// Cell position on a ship-board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: i8,
    pub col: i8,
}

impl Coord {
    pub fn new(row: i8, col: i8) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(&self) -> bool {
        (0..BOARD_DIM).contains(&self.row) && (0..BOARD_DIM).contains(&self.col)
    }
}

/// Ship components, limited to what card resolution reads and mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    Cannon {
        double: bool,
        facing: Direction,
    },
    Engine {
        double: bool,
    },
    /// A shield covers two adjacent cardinal directions
    Shield {
        covers: [Direction; 2],
    },
    BatteryBox {
        charges: u8,
        capacity: u8,
    },
    Cabin {
        crew: u8,
    },
    Storage {
        goods: u8,
        capacity: u8,
    },
    Structural,
}

/// A player's personal component grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipBoard {
    slots: BTreeMap<Coord, Component>,
}

impl ShipBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a component during the building phase. Returns false when
    /// the coordinate is out of bounds, already occupied, or the
    /// component payload is malformed. Placements come straight from
    /// clients, so fill levels above capacity are rejected here rather
    /// than trusted downstream.
    pub fn place(&mut self, coord: Coord, component: Component) -> bool {
        let well_formed = match component {
            Component::BatteryBox { charges, capacity } => charges <= capacity,
            Component::Storage { goods, capacity } => goods <= capacity,
            _ => true,
        };
        if !well_formed || !coord.in_bounds() || self.slots.contains_key(&coord) {
            return false;
        }
        self.slots.insert(coord, component);
        true
    }

    pub fn component_at(&self, coord: Coord) -> Option<&Component> {
        self.slots.get(&coord)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// First occupied cell a hazard traveling inward from `direction`
    /// along `line` would strike. `line` is a column for north/south
    /// hazards and a row for east/west hazards.
    pub fn exposed_component(&self, direction: Direction, line: i8) -> Option<Coord> {
        let on_line = self.slots.keys().filter(|c| match direction {
            Direction::North | Direction::South => c.col == line,
            Direction::East | Direction::West => c.row == line,
        });
        match direction {
            Direction::North => on_line.min_by_key(|c| c.row).copied(),
            Direction::South => on_line.max_by_key(|c| c.row).copied(),
            Direction::West => on_line.min_by_key(|c| c.col).copied(),
            Direction::East => on_line.max_by_key(|c| c.col).copied(),
        }
    }

    /// Remove the component at `coord`, returning it
    pub fn destroy(&mut self, coord: Coord) -> Option<Component> {
        self.slots.remove(&coord)
    }

    /// True when the component at `coord` is a shield covering `direction`
    pub fn shield_covers(&self, coord: Coord, direction: Direction) -> bool {
        matches!(
            self.slots.get(&coord),
            Some(Component::Shield { covers }) if covers.contains(&direction)
        )
    }

    /// Remaining charges if the component at `coord` is a battery box
    pub fn battery_charges(&self, coord: Coord) -> Option<u8> {
        match self.slots.get(&coord) {
            Some(Component::BatteryBox { charges, .. }) => Some(*charges),
            _ => None,
        }
    }

    /// Consume one charge from the battery box at `coord`. Returns false
    /// when the box is empty (charges are left untouched).
    pub fn discharge_battery(&mut self, coord: Coord) -> bool {
        match self.slots.get_mut(&coord) {
            Some(Component::BatteryBox { charges, .. }) if *charges > 0 => {
                *charges -= 1;
                true
            }
            _ => false,
        }
    }

    /// True when the component at `coord` is a double cannon that can
    /// shoot down a hazard arriving from `direction` along `line`: it
    /// must face the hazard and sit on the impact line.
    pub fn cannon_defends(&self, coord: Coord, direction: Direction, line: i8) -> bool {
        let aligned = match direction {
            Direction::North | Direction::South => coord.col == line,
            Direction::East | Direction::West => coord.row == line,
        };
        aligned
            && matches!(
                self.slots.get(&coord),
                Some(Component::Cannon { double: true, facing }) if *facing == direction
            )
    }

    pub fn is_double_cannon(&self, coord: Coord) -> bool {
        matches!(
            self.slots.get(&coord),
            Some(Component::Cannon { double: true, .. })
        )
    }

    pub fn is_double_engine(&self, coord: Coord) -> bool {
        matches!(self.slots.get(&coord), Some(Component::Engine { double: true }))
    }

    /// Total engine power: one per single engine, two per double engine
    /// listed in `powered` (doubles contribute nothing unless powered).
    pub fn engine_power(&self, powered: &[Coord]) -> u32 {
        self.slots
            .iter()
            .filter_map(|(coord, component)| match component {
                Component::Engine { double: false } => Some(1),
                Component::Engine { double: true } if powered.contains(coord) => Some(2),
                _ => None,
            })
            .sum()
    }

    /// Total cannon strength. Forward (north-facing) cannons count full,
    /// the rest half; double cannons contribute nothing unless `powered`.
    pub fn cannon_strength(&self, powered: &[Coord]) -> f32 {
        self.slots
            .iter()
            .filter_map(|(coord, component)| match component {
                Component::Cannon { double, facing } => {
                    let base = if *facing == Direction::North { 1.0 } else { 0.5 };
                    if *double {
                        powered.contains(coord).then_some(base * 2.0)
                    } else {
                        Some(base)
                    }
                }
                _ => None,
            })
            .sum()
    }

    /// Crew in the cabin at `coord`, if it is one
    pub fn cabin_crew(&self, coord: Coord) -> Option<u8> {
        match self.slots.get(&coord) {
            Some(Component::Cabin { crew }) => Some(*crew),
            _ => None,
        }
    }

    /// Remove one crew member from the cabin at `coord`
    pub fn remove_crew(&mut self, coord: Coord) -> bool {
        match self.slots.get_mut(&coord) {
            Some(Component::Cabin { crew }) if *crew > 0 => {
                *crew -= 1;
                true
            }
            _ => false,
        }
    }

    /// Free space in the storage component at `coord`, if it is one
    pub fn storage_space(&self, coord: Coord) -> Option<u8> {
        match self.slots.get(&coord) {
            Some(Component::Storage { goods, capacity }) => Some(capacity.saturating_sub(*goods)),
            _ => None,
        }
    }

    /// Load one unit of goods into the storage at `coord`
    pub fn add_goods(&mut self, coord: Coord) -> bool {
        match self.slots.get_mut(&coord) {
            Some(Component::Storage { goods, capacity }) if *goods < *capacity => {
                *goods += 1;
                true
            }
            _ => false,
        }
    }

    pub fn total_goods(&self) -> u32 {
        self.slots
            .values()
            .filter_map(|c| match c {
                Component::Storage { goods, .. } => Some(*goods as u32),
                _ => None,
            })
            .sum()
    }

    /// Build the wire value broadcast in `ShipBoardUpdated`
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cells: self
                .slots
                .iter()
                .map(|(coord, component)| BoardCell {
                    coord: *coord,
                    component: *component,
                })
                .collect(),
        }
    }
}

/// Serializable view of a ship-board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub cells: Vec<BoardCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCell {
    pub coord: Coord,
    pub component: Component,
}
