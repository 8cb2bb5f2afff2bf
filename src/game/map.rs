//! Terrain grid, occupancy index and sector partition.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::DecodeError;
use crate::game::{EntityId, Location, NEUTRAL_TEAM_ID, TeamId};

/// Type of terrain on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tile {
    /// Plain ground.
    Grass,
    /// Thrown entities landing here take extra damage.
    Dirt,
}

impl Tile {
    /// Decode the single-character wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownTile`] for anything but `G` or `D`.
    pub fn from_symbol(symbol: char) -> Result<Self, DecodeError> {
        match symbol {
            'G' => Ok(Tile::Grass),
            'D' => Ok(Tile::Dirt),
            other => Err(DecodeError::UnknownTile(other)),
        }
    }

    /// The single-character wire form.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Tile::Grass => 'G',
            Tile::Dirt => 'D',
        }
    }
}

/// A square block of the map controlled by one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sector {
    /// Corner with the smallest coordinates; always a multiple of the sector size.
    pub top_left: Location,
    /// Controlling team. Uncontrolled sectors belong to the neutral team.
    pub team: TeamId,
}

/// The game map.
#[derive(Debug, Clone)]
pub struct Map {
    width: u32,
    height: u32,
    sector_size: u32,
    /// Row-major from `y = 0` upward.
    tiles: Vec<Tile>,
    sectors: BTreeMap<Location, Sector>,
    /// Free-standing entities by location. Held entities are never present.
    occupied: HashMap<Location, EntityId>,
}

impl Map {
    /// Create an all-grass map with every sector neutral.
    ///
    /// Returns `None` if any dimension or the sector size is zero.
    #[must_use]
    pub fn new(width: u32, height: u32, sector_size: u32) -> Option<Self> {
        if width == 0 || height == 0 || sector_size == 0 {
            return None;
        }
        let width_i = i32::try_from(width).ok()?;
        let height_i = i32::try_from(height).ok()?;
        let step = usize::try_from(sector_size).ok()?;

        let mut sectors = BTreeMap::new();
        for x in (0..width_i).step_by(step) {
            for y in (0..height_i).step_by(step) {
                let top_left = Location::new(x, y);
                sectors.insert(
                    top_left,
                    Sector {
                        top_left,
                        team: NEUTRAL_TEAM_ID,
                    },
                );
            }
        }

        let size = usize::try_from(u64::from(width) * u64::from(height)).ok()?;
        Some(Self {
            width,
            height,
            sector_size,
            tiles: vec![Tile::Grass; size],
            sectors,
            occupied: HashMap::new(),
        })
    }

    /// Build a map from wire tile rows.
    ///
    /// The first row is the northmost one (`y = height - 1`).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MapShape`] if the rows do not match the
    /// dimensions or the sector size is zero, and
    /// [`DecodeError::UnknownTile`] for an unknown tile symbol.
    pub fn from_rows<S: AsRef<str>>(
        width: u32,
        height: u32,
        rows: &[S],
        sector_size: u32,
    ) -> Result<Self, DecodeError> {
        let shape_error = |detail: String| DecodeError::MapShape {
            width,
            height,
            detail,
        };
        // Shape is checked against the rows before anything is allocated.
        if u32::try_from(rows.len()).ok() != Some(height) {
            return Err(shape_error(format!("{} rows", rows.len())));
        }
        for (row_index, row) in rows.iter().enumerate() {
            let tiles = row.as_ref().chars().count();
            if u32::try_from(tiles).ok() != Some(width) {
                return Err(shape_error(format!("row {row_index} has {tiles} tiles")));
            }
        }

        let mut map = Self::new(width, height, sector_size)
            .ok_or_else(|| shape_error(format!("sector size {sector_size} with empty grid")))?;

        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let y = map.height_i32() - 1 - i32::try_from(row_index).unwrap_or(i32::MAX);
            for (x, symbol) in (0..).zip(row.chars()) {
                map.set_tile(Location::new(x, y), Tile::from_symbol(symbol)?);
            }
        }

        Ok(map)
    }

    /// Width of the map in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the map in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Side length of a sector.
    #[must_use]
    pub const fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn height_i32(&self) -> i32 {
        i32::try_from(self.height).unwrap_or(i32::MAX)
    }

    /// Check whether a location lies on the map.
    #[must_use]
    pub fn location_on_map(&self, location: Location) -> bool {
        u32::try_from(location.x).is_ok_and(|x| x < self.width)
            && u32::try_from(location.y).is_ok_and(|y| y < self.height)
    }

    fn index(&self, location: Location) -> Option<usize> {
        if !self.location_on_map(location) {
            return None;
        }
        let x = usize::try_from(location.x).ok()?;
        let y = usize::try_from(location.y).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(y * width + x)
    }

    /// Terrain at a location, `None` off the map.
    #[must_use]
    pub fn tile_at(&self, location: Location) -> Option<Tile> {
        self.index(location).map(|idx| self.tiles[idx])
    }

    /// Set the terrain at a location.
    ///
    /// Returns `false` if the location is off the map.
    pub fn set_tile(&mut self, location: Location, tile: Tile) -> bool {
        if let Some(idx) = self.index(location) {
            self.tiles[idx] = tile;
            true
        } else {
            false
        }
    }

    /// Top-left corner of the sector containing `location`.
    #[must_use]
    pub fn sector_origin(&self, location: Location) -> Option<Location> {
        if !self.location_on_map(location) {
            return None;
        }
        let size = i32::try_from(self.sector_size).ok()?;
        Some(Location::new(
            location.x - location.x % size,
            location.y - location.y % size,
        ))
    }

    /// The sector containing `location`, `None` off the map.
    #[must_use]
    pub fn sector_at(&self, location: Location) -> Option<&Sector> {
        self.sector_origin(location)
            .and_then(|origin| self.sectors.get(&origin))
    }

    /// The sector with the given top-left corner.
    #[must_use]
    pub fn sector(&self, top_left: Location) -> Option<&Sector> {
        self.sectors.get(&top_left)
    }

    /// All sectors ordered by top-left corner.
    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    /// Record a new controlling team for a sector.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnknownSector`] if `top_left` is not a sector origin.
    pub fn set_sector_team(&mut self, top_left: Location, team: TeamId) -> Result<(), DecodeError> {
        let sector = self
            .sectors
            .get_mut(&top_left)
            .ok_or(DecodeError::UnknownSector(top_left))?;
        sector.team = team;
        Ok(())
    }

    /// The free-standing entity at a location.
    #[must_use]
    pub fn occupant(&self, location: Location) -> Option<EntityId> {
        self.occupied.get(&location).copied()
    }

    /// True if a free-standing entity stands at `location`.
    #[must_use]
    pub fn is_occupied(&self, location: Location) -> bool {
        self.occupied.contains_key(&location)
    }

    /// True if `location` is on the map and nobody stands there.
    #[must_use]
    pub fn is_free(&self, location: Location) -> bool {
        self.location_on_map(location) && !self.is_occupied(location)
    }

    /// Every occupancy entry, in no particular order.
    pub fn occupied(&self) -> impl Iterator<Item = (Location, EntityId)> + '_ {
        self.occupied.iter().map(|(&location, &id)| (location, id))
    }

    pub(crate) fn occupy(&mut self, location: Location, id: EntityId) {
        self.occupied.insert(location, id);
    }

    /// Vacate `location` only if `id` is the one standing there.
    pub(crate) fn vacate_if(&mut self, location: Location, id: EntityId) -> bool {
        if self.occupant(location) == Some(id) {
            self.occupied.remove(&location);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_zero_size() {
        assert!(Map::new(0, 10, 5).is_none());
        assert!(Map::new(10, 0, 5).is_none());
        assert!(Map::new(10, 10, 0).is_none());
    }

    #[test]
    fn test_rows_are_north_first() {
        let rows = ["GGD", "DGG"];
        let map = Map::from_rows(3, 2, &rows, 2).unwrap();
        assert_eq!(map.tile_at(Location::new(2, 1)), Some(Tile::Dirt));
        assert_eq!(map.tile_at(Location::new(0, 0)), Some(Tile::Dirt));
        assert_eq!(map.tile_at(Location::new(0, 1)), Some(Tile::Grass));
        assert_eq!(map.tile_at(Location::new(3, 0)), None);
    }

    #[test]
    fn test_rows_shape_checked() {
        assert!(matches!(
            Map::from_rows(3, 2, &["GGG"], 1),
            Err(DecodeError::MapShape { .. })
        ));
        assert!(matches!(
            Map::from_rows(3, 1, &["GG"], 1),
            Err(DecodeError::MapShape { .. })
        ));
        assert_eq!(
            Map::from_rows(1, 1, &["X"], 1).unwrap_err(),
            DecodeError::UnknownTile('X')
        );
    }

    #[test]
    fn test_huge_dimensions_without_rows_rejected() {
        let rows: [&str; 0] = [];
        assert!(matches!(
            Map::from_rows(100_000, 100_000, &rows, 1),
            Err(DecodeError::MapShape { .. })
        ));
        let rows = ["G"; 3];
        assert!(matches!(
            Map::from_rows(100_000, 3, &rows, 1),
            Err(DecodeError::MapShape { .. })
        ));
    }

    #[test]
    fn test_bounds() {
        let map = Map::new(4, 3, 2).unwrap();
        assert!(map.location_on_map(Location::new(0, 0)));
        assert!(map.location_on_map(Location::new(3, 2)));
        assert!(!map.location_on_map(Location::new(4, 0)));
        assert!(!map.location_on_map(Location::new(0, 3)));
        assert!(!map.location_on_map(Location::new(-1, 1)));
    }

    #[test]
    fn test_sector_partition() {
        let map = Map::new(5, 5, 2).unwrap();
        assert_eq!(map.sectors().count(), 9);
        assert_eq!(
            map.sector_at(Location::new(3, 4)).map(|s| s.top_left),
            Some(Location::new(2, 4))
        );
        assert_eq!(map.sector_at(Location::new(-1, 0)), None);
        assert!(map.sectors().all(|s| s.team == NEUTRAL_TEAM_ID));
    }

    #[test]
    fn test_set_sector_team() {
        let mut map = Map::new(4, 4, 2).unwrap();
        map.set_sector_team(Location::new(2, 0), 1).unwrap();
        assert_eq!(map.sector_at(Location::new(3, 1)).map(|s| s.team), Some(1));
        assert_eq!(
            map.set_sector_team(Location::new(1, 0), 1),
            Err(DecodeError::UnknownSector(Location::new(1, 0)))
        );
    }

    #[test]
    fn test_occupancy() {
        let mut map = Map::new(4, 4, 2).unwrap();
        let spot = Location::new(1, 1);
        assert!(map.is_free(spot));
        map.occupy(spot, 7);
        assert_eq!(map.occupant(spot), Some(7));
        assert!(!map.is_free(spot));
        assert!(!map.vacate_if(spot, 8));
        assert!(map.vacate_if(spot, 7));
        assert!(!map.is_occupied(spot));
        assert!(!map.is_free(Location::new(9, 9)));
    }
}
