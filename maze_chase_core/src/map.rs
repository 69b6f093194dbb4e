use std::{
    fmt,
    ops::{Index, IndexMut},
};

use serde::{Deserialize, Serialize};

use crate::{Cell, Point};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {z}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        z: usize,
        width: usize,
        height: usize,
    },
    #[error("Grid size ({width}, {height}) overflows the addressable cell count")]
    TooLarge { width: usize, height: usize },
}

/// Errors raised while reading a maze from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapParseError {
    #[error("map text is empty")]
    Empty,
    #[error("inconsistent width at row {row}: expected {expected}, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown map glyph '{glyph}' at ({x}, {z})")]
    UnknownGlyph { glyph: char, x: usize, z: usize },
    #[error("map has no player spawn ('P')")]
    MissingSpawn,
    #[error("map has more than one player spawn ('P'), second at ({x}, {z})")]
    DuplicateSpawn { x: usize, z: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Classification of a single maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    /// Wall segment running along the x axis.
    WallHorizontal,
    /// Wall segment running along the z axis.
    WallVertical,
    Door,
    Window,
    Fixed,
    PlayerSpawn,
}

impl CellKind {
    /// Whether entities may occupy a cell of this kind.
    pub fn is_walkable(self) -> bool {
        matches!(
            self,
            CellKind::Empty | CellKind::PlayerSpawn | CellKind::Door
        )
    }

    pub fn is_wall(self) -> bool {
        matches!(self, CellKind::WallHorizontal | CellKind::WallVertical)
    }

    /// Free cells are the open floor the generator reasons about.
    pub fn is_free(self) -> bool {
        matches!(self, CellKind::Empty | CellKind::PlayerSpawn)
    }

    pub fn glyph(self) -> char {
        match self {
            CellKind::Empty => '.',
            CellKind::WallHorizontal => '-',
            CellKind::WallVertical => '|',
            CellKind::Door => 'D',
            CellKind::Window => 'J',
            CellKind::Fixed => 'F',
            CellKind::PlayerSpawn => 'P',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        let kind = match glyph {
            '.' => CellKind::Empty,
            '-' => CellKind::WallHorizontal,
            '|' => CellKind::WallVertical,
            'D' => CellKind::Door,
            'J' => CellKind::Window,
            'F' => CellKind::Fixed,
            'P' => CellKind::PlayerSpawn,
            _ => return None,
        };
        Some(kind)
    }
}

/// A rectangular 2D grid.
///
/// Stores elements of type `T` in a flat vector using row-major order, one
/// row per `z`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid filled with default values.
    ///
    /// # Errors
    ///
    /// Returns `GridError::TooLarge` if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Result<Self, GridError>
    where
        T: Default + Clone,
    {
        let size = Self::cell_count(width, height)?;
        Ok(Grid {
            width,
            height,
            cells: vec![T::default(); size],
        })
    }

    /// Creates a new grid filled by a generator function.
    ///
    /// `f` is called once per cell in row-major order, which keeps generators
    /// that draw from a random source reproducible.
    ///
    /// # Errors
    ///
    /// Returns `GridError::TooLarge` if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Result<Self, GridError>
    where
        F: FnMut(Cell) -> T,
    {
        let size = Self::cell_count(width, height)?;
        let mut cells = Vec::with_capacity(size);
        for z in 0..height {
            for x in 0..width {
                cells.push(f(Cell::new(x, z)));
            }
        }
        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    fn cell_count(width: usize, height: usize) -> Result<usize, GridError> {
        width
            .checked_mul(height)
            .ok_or(GridError::TooLarge { width, height })
    }

    /// Returns the width of the grid (extent along x).
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid (extent along z).
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a cell to its flat vector index.
    ///
    /// Returns `None` if the cell is out of bounds.
    #[inline]
    fn offset(&self, cell: Cell) -> Option<usize> {
        self.contains(cell).then(|| cell.z * self.width + cell.x)
    }

    /// Checks if the given cell is within the grid boundaries.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.z < self.height
    }

    /// Whether the cell lies on the outermost ring of the grid.
    pub fn is_border(&self, cell: Cell) -> bool {
        self.contains(cell)
            && (cell.x == 0 || cell.z == 0 || cell.x + 1 == self.width || cell.z + 1 == self.height)
    }

    /// Gets an immutable reference to the value at the given cell.
    ///
    /// Returns `None` if the cell is out of bounds.
    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.offset(cell).map(|index| &self.cells[index])
    }

    /// Gets a mutable reference to the value at the given cell.
    ///
    /// Returns `None` if the cell is out of bounds.
    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut T> {
        self.offset(cell).map(|index| &mut self.cells[index])
    }

    /// Sets the value of a cell, failing with `GridError::OutOfBounds` for
    /// coordinates outside the grid.
    pub fn set(&mut self, cell: Cell, value: T) -> Result<(), GridError> {
        let index = self.offset(cell).ok_or(GridError::OutOfBounds {
            x: cell.x,
            z: cell.z,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Iterates over every cell with its coordinates, in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Cell, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, value)| (Cell::new(index % width, index / width), value))
    }

    /// Iterates over the cells that are not on the border, in row-major order.
    pub fn interior(&self) -> impl Iterator<Item = Cell> + use<T> {
        let (width, height) = (self.width, self.height);
        (1..height.saturating_sub(1))
            .flat_map(move |z| (1..width.saturating_sub(1)).map(move |x| Cell::new(x, z)))
    }
}

impl<T> Index<Cell> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: Cell) -> &Self::Output {
        match self.offset(cell) {
            Some(index) => &self.cells[index],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.z, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Cell> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, cell: Cell) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.offset(cell) {
            Some(index) => &mut self.cells[index],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.z, width, height
            ),
        }
    }
}

impl Grid<CellKind> {
    /// Kind of the cell, or `None` outside the grid.
    pub fn kind_at(&self, cell: Cell) -> Option<CellKind> {
        self.get(cell).copied()
    }

    /// Out-of-bounds cells are never walkable.
    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.kind_at(cell).is_some_and(CellKind::is_walkable)
    }

    /// Shared collision rule for continuous positions: the containing cell
    /// must exist and be walkable.
    pub fn collides(&self, point: Point) -> bool {
        !point.cell().is_some_and(|cell| self.is_walkable(cell))
    }

    /// Every cell of the given kind, in row-major order.
    pub fn cells_of_kind(&self, kind: CellKind) -> impl Iterator<Item = Cell> + '_ {
        self.enumerate()
            .filter(move |(_, value)| **value == kind)
            .map(|(cell, _)| cell)
    }

    pub fn walkable_cells(&self) -> Vec<Cell> {
        self.enumerate()
            .filter(|(_, kind)| kind.is_walkable())
            .map(|(cell, _)| cell)
            .collect()
    }

    /// The first `PlayerSpawn` cell in row-major order.
    pub fn spawn_cell(&self) -> Option<Cell> {
        self.cells_of_kind(CellKind::PlayerSpawn).next()
    }
}

/// Renders one glyph per cell, one line per row; the inverse of [`parse_map`].
impl fmt::Display for Grid<CellKind> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for z in 0..self.height {
            for x in 0..self.width {
                write!(f, "{}", self[Cell::new(x, z)].glyph())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Loads a maze from its text form.
///
/// Each non-blank line is a row; whitespace inside a line is ignored. Glyphs
/// follow [`CellKind::glyph`], and exactly one `P` must be present.
pub fn parse_map(text: &str) -> Result<Grid<CellKind>, MapParseError> {
    let rows: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();

    let Some(first) = rows.first() else {
        return Err(MapParseError::Empty);
    };
    let width = first.len();

    let mut kinds = Vec::with_capacity(width * rows.len());
    let mut spawn: Option<Cell> = None;
    for (z, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(MapParseError::RaggedRow {
                row: z,
                expected: width,
                found: row.len(),
            });
        }
        for (x, glyph) in row.iter().enumerate() {
            let kind = CellKind::from_glyph(*glyph).ok_or(MapParseError::UnknownGlyph {
                glyph: *glyph,
                x,
                z,
            })?;
            if kind == CellKind::PlayerSpawn {
                if spawn.is_some() {
                    return Err(MapParseError::DuplicateSpawn { x, z });
                }
                spawn = Some(Cell::new(x, z));
            }
            kinds.push(kind);
        }
    }
    if spawn.is_none() {
        return Err(MapParseError::MissingSpawn);
    }

    let mut kinds = kinds.into_iter();
    let grid = Grid::from_generator(width, rows.len(), |_| {
        kinds.next().unwrap_or_default()
    })?;
    Ok(grid)
}
