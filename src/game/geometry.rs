//! Compass directions and grid locations.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Ratio above which a delta is snapped onto the dominant axis.
const AXIS_SNAP_RATIO: f64 = 2.414;

/// One of the eight compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// (-1, -1)
    SouthWest,
    /// (0, -1)
    South,
    /// (1, -1)
    SouthEast,
    /// (1, 0)
    East,
    /// (1, 1)
    NorthEast,
    /// (0, 1)
    North,
    /// (-1, 1)
    NorthWest,
    /// (-1, 0)
    West,
}

impl Direction {
    /// All directions, starting at south-west and proceeding counter-clockwise.
    pub const ALL: [Direction; 8] = [
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
        Direction::East,
        Direction::NorthEast,
        Direction::North,
        Direction::NorthWest,
        Direction::West,
    ];

    /// The four axis-aligned directions, counter-clockwise from south.
    pub const CARDINAL: [Direction; 4] = [
        Direction::South,
        Direction::East,
        Direction::North,
        Direction::West,
    ];

    /// Horizontal component of the unit step.
    #[must_use]
    pub const fn dx(self) -> i32 {
        match self {
            Direction::SouthWest | Direction::West | Direction::NorthWest => -1,
            Direction::South | Direction::North => 0,
            Direction::SouthEast | Direction::East | Direction::NorthEast => 1,
        }
    }

    /// Vertical component of the unit step.
    #[must_use]
    pub const fn dy(self) -> i32 {
        match self {
            Direction::SouthWest | Direction::South | Direction::SouthEast => -1,
            Direction::West | Direction::East => 0,
            Direction::NorthWest | Direction::North | Direction::NorthEast => 1,
        }
    }

    /// Index of this direction in [`Direction::ALL`].
    #[must_use]
    const fn index(self) -> usize {
        match self {
            Direction::SouthWest => 0,
            Direction::South => 1,
            Direction::SouthEast => 2,
            Direction::East => 3,
            Direction::NorthEast => 4,
            Direction::North => 5,
            Direction::NorthWest => 6,
            Direction::West => 7,
        }
    }

    /// The direction with exactly this unit delta.
    ///
    /// Returns `None` unless both components are in `{-1, 0, 1}` and not both zero.
    #[must_use]
    pub fn from_unit(dx: i32, dy: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.dx() == dx && direction.dy() == dy)
    }

    /// The compass direction closest to an arbitrary delta.
    ///
    /// A component is dropped when the other one is at least 2.414 times
    /// larger, which splits the circle into eight 45 degree wedges.
    /// Returns `None` for `(0, 0)`.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        let (fx, fy) = (f64::from(dx.abs()), f64::from(dy.abs()));
        let (dx, dy) = if fx >= AXIS_SNAP_RATIO * fy {
            (dx, 0)
        } else if fy >= AXIS_SNAP_RATIO * fx {
            (0, dy)
        } else {
            (dx, dy)
        };
        Self::from_unit(dx.signum(), dy.signum())
    }

    /// Rotate counter-clockwise by a multiple of 45 degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnalignedRotation`] if `degrees` is not a
    /// multiple of 45.
    pub fn rotate_counter_clockwise_degrees(self, degrees: i32) -> Result<Self, GeometryError> {
        if degrees % 45 != 0 {
            return Err(GeometryError::UnalignedRotation(degrees));
        }
        let steps = (degrees / 45).rem_euclid(8);
        #[allow(clippy::cast_sign_loss)]
        let index = (self.index() + steps as usize) % Self::ALL.len();
        Ok(Self::ALL[index])
    }

    /// Rotate by `steps` eighths of a turn counter-clockwise.
    #[must_use]
    const fn rotate_steps(self, steps: usize) -> Self {
        Self::ALL[(self.index() + steps) % 8]
    }

    /// The direction 90 degrees to the left.
    #[must_use]
    pub const fn rotate_left(self) -> Self {
        self.rotate_steps(2)
    }

    /// The direction 90 degrees to the right.
    #[must_use]
    pub const fn rotate_right(self) -> Self {
        self.rotate_steps(6)
    }

    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        self.rotate_steps(4)
    }
}

/// An integer grid location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate (column, grows eastward).
    pub x: i32,
    /// Y coordinate (row, grows northward).
    pub y: i32,
}

impl Location {
    /// Create a new location.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub fn distance_squared_to(self, other: Location) -> i64 {
        let dx = i64::from(other.x) - i64::from(self.x);
        let dy = i64::from(other.y) - i64::from(self.y);
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn distance_to(self, other: Location) -> f64 {
        (self.distance_squared_to(other) as f64).sqrt()
    }

    /// Number of single steps (diagonals included) needed to reach `other`.
    #[must_use]
    pub const fn adjacent_distance_to(self, other: Location) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Closest compass direction towards `other`, `None` if they coincide.
    #[must_use]
    pub fn direction_to(self, other: Location) -> Option<Direction> {
        Direction::from_delta(other.x - self.x, other.y - self.y)
    }

    /// The neighbouring location in `direction`. Not necessarily on the map.
    #[must_use]
    pub const fn adjacent_in(self, direction: Direction) -> Location {
        Location::new(
            self.x.saturating_add(direction.dx()),
            self.y.saturating_add(direction.dy()),
        )
    }

    /// True if `other` is within one step, including `self`.
    #[must_use]
    pub fn is_adjacent(self, other: Location) -> bool {
        self.distance_squared_to(other) <= 2
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{},{}>", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_deltas_are_units() {
        for direction in Direction::ALL {
            assert!((-1..=1).contains(&direction.dx()));
            assert!((-1..=1).contains(&direction.dy()));
            assert!((direction.dx(), direction.dy()) != (0, 0));
        }
    }

    #[test]
    fn test_rotation_order() {
        assert_eq!(
            Direction::SouthWest.rotate_counter_clockwise_degrees(45),
            Ok(Direction::South)
        );
        assert_eq!(
            Direction::West.rotate_counter_clockwise_degrees(45),
            Ok(Direction::SouthWest)
        );
        assert_eq!(
            Direction::North.rotate_counter_clockwise_degrees(-90),
            Ok(Direction::East)
        );
        assert_eq!(
            Direction::East.rotate_counter_clockwise_degrees(360),
            Ok(Direction::East)
        );
        assert!(Direction::East.rotate_counter_clockwise_degrees(30).is_err());
    }

    #[test]
    fn test_rotate_helpers() {
        assert_eq!(Direction::North.rotate_left(), Direction::West);
        assert_eq!(Direction::North.rotate_right(), Direction::East);
        assert_eq!(Direction::NorthEast.opposite(), Direction::SouthWest);
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_eq!(direction.rotate_left().rotate_right(), direction);
        }
    }

    #[test]
    fn test_from_delta_snaps_to_axis() {
        assert_eq!(Direction::from_delta(10, 1), Some(Direction::East));
        assert_eq!(Direction::from_delta(-1, -10), Some(Direction::South));
        assert_eq!(Direction::from_delta(3, 2), Some(Direction::NorthEast));
        assert_eq!(Direction::from_delta(-5, 4), Some(Direction::NorthWest));
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn test_from_unit() {
        assert_eq!(Direction::from_unit(1, -1), Some(Direction::SouthEast));
        assert_eq!(Direction::from_unit(0, 0), None);
        assert_eq!(Direction::from_unit(2, 0), None);
    }

    #[test]
    fn test_distances() {
        let a = Location::new(1, 1);
        let b = Location::new(4, 5);
        assert_eq!(a.distance_squared_to(b), 25);
        assert!((a.distance_to(b) - 5.0).abs() < 1e-9);
        assert_eq!(a.adjacent_distance_to(b), 4);
        assert_eq!(b.adjacent_distance_to(a), 4);
    }

    #[test]
    fn test_adjacency() {
        let origin = Location::new(3, 3);
        assert!(origin.is_adjacent(Location::new(4, 4)));
        assert!(origin.is_adjacent(origin));
        assert!(!origin.is_adjacent(Location::new(5, 3)));
        assert_eq!(origin.adjacent_in(Direction::NorthWest), Location::new(2, 4));
    }

    #[test]
    fn test_direction_to() {
        let origin = Location::new(0, 0);
        assert_eq!(origin.direction_to(Location::new(0, 7)), Some(Direction::North));
        assert_eq!(origin.direction_to(Location::new(-3, -3)), Some(Direction::SouthWest));
        assert_eq!(origin.direction_to(origin), None);
    }
}
