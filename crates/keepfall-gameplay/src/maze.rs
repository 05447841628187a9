//! Randomized depth-first maze carving on a tile grid.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::ExitMask;
use crate::level::{LevelError, LevelResult};

/// One side of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallSide {
    /// Towards row - 1
    Top,
    /// Towards row + 1
    Bottom,
    /// Towards column - 1
    Left,
    /// Towards column + 1
    Right,
}

impl WallSide {
    /// All sides.
    pub const ALL: [WallSide; 4] = [
        WallSide::Top,
        WallSide::Bottom,
        WallSide::Left,
        WallSide::Right,
    ];

    /// The side facing this one from the neighbouring cell.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            WallSide::Top => WallSide::Bottom,
            WallSide::Bottom => WallSide::Top,
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
        }
    }

    fn offset(self) -> (i64, i64) {
        match self {
            WallSide::Top => (0, -1),
            WallSide::Bottom => (0, 1),
            WallSide::Left => (-1, 0),
            WallSide::Right => (1, 0),
        }
    }
}

/// Four wall flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    /// Wall above
    pub top: bool,
    /// Wall below
    pub bottom: bool,
    /// Wall on the left
    pub left: bool,
    /// Wall on the right
    pub right: bool,
}

impl Walls {
    /// Every side walled.
    pub const CLOSED: Self = Self {
        top: true,
        bottom: true,
        left: true,
        right: true,
    };
    /// No side walled.
    pub const OPEN: Self = Self {
        top: false,
        bottom: false,
        left: false,
        right: false,
    };

    /// Flag for a side.
    #[must_use]
    pub fn get(&self, side: WallSide) -> bool {
        match side {
            WallSide::Top => self.top,
            WallSide::Bottom => self.bottom,
            WallSide::Left => self.left,
            WallSide::Right => self.right,
        }
    }

    /// Set the flag for a side.
    pub fn set(&mut self, side: WallSide, value: bool) {
        match side {
            WallSide::Top => self.top = value,
            WallSide::Bottom => self.bottom = value,
            WallSide::Left => self.left = value,
            WallSide::Right => self.right = value,
        }
    }
}

/// A maze cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MazeNode {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Walls currently standing
    pub walls: Walls,
    /// Walls carving may not remove
    pub forced: Walls,
}

impl MazeNode {
    /// Open sides as an exit mask.
    #[must_use]
    pub fn exit_mask(&self) -> ExitMask {
        let mut mask = ExitMask::NONE;
        for (side, exit) in [
            (WallSide::Left, ExitMask::LEFT),
            (WallSide::Top, ExitMask::TOP),
            (WallSide::Right, ExitMask::RIGHT),
            (WallSide::Bottom, ExitMask::BOTTOM),
        ] {
            if !self.walls.get(side) {
                mask.insert(exit);
            }
        }
        mask
    }
}

/// A wall that carving must keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForcedWall {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
    /// Side of the cell
    pub side: WallSide,
}

/// Grid of cells; row 0 is the top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maze {
    cols: u32,
    rows: u32,
    nodes: Vec<MazeNode>,
}

impl Maze {
    /// A fully walled grid whose outer boundary is forced.
    pub fn new(cols: u32, rows: u32) -> LevelResult<Self> {
        if cols == 0 || rows == 0 {
            return Err(LevelError::DegenerateGrid { cols, rows });
        }

        let nodes = (0..rows)
            .flat_map(|y| (0..cols).map(move |x| (x, y)))
            .map(|(x, y)| MazeNode {
                x,
                y,
                walls: Walls::CLOSED,
                forced: Walls {
                    top: y == 0,
                    bottom: y == rows - 1,
                    left: x == 0,
                    right: x == cols - 1,
                },
            })
            .collect();

        Ok(Self { cols, rows, nodes })
    }

    /// Carve, apply corner constraints and repair symmetry.
    pub fn generate(cols: u32, rows: u32, rng: &mut fastrand::Rng) -> LevelResult<Self> {
        Self::generate_with_forced(cols, rows, &[], rng)
    }

    /// Like [`Maze::generate`], with extra walls forced before carving.
    pub fn generate_with_forced(
        cols: u32,
        rows: u32,
        forced: &[ForcedWall],
        rng: &mut fastrand::Rng,
    ) -> LevelResult<Self> {
        let mut maze = Self::new(cols, rows)?;
        for wall in forced {
            maze.force_wall(wall.x, wall.y, wall.side);
        }
        maze.carve(rng);
        maze.apply_corner_constraints();
        let repaired = maze.repair_symmetry();
        if repaired > 0 {
            debug!("Repaired {} asymmetric walls", repaired);
        }

        let reachable = maze.reachable_from(maze.entry());
        let total = maze.nodes.len();
        if reachable < total {
            warn!("Maze disconnected: {}/{} cells reachable from entry", reachable, total);
        }
        Ok(maze)
    }

    /// Columns.
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Rows.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// All cells, row-major.
    #[must_use]
    pub fn nodes(&self) -> &[MazeNode] {
        &self.nodes
    }

    /// Cell at a column and row.
    #[must_use]
    pub fn node(&self, x: u32, y: u32) -> Option<&MazeNode> {
        self.index(i64::from(x), i64::from(y)).map(|i| &self.nodes[i])
    }

    /// Entry cell: bottom-left.
    #[must_use]
    pub fn entry(&self) -> (u32, u32) {
        (0, self.rows - 1)
    }

    /// Exit cell: top-right.
    #[must_use]
    pub fn exit(&self) -> (u32, u32) {
        (self.cols - 1, 0)
    }

    /// Forbid carving through one wall (both sides of it).
    pub fn force_wall(&mut self, x: u32, y: u32, side: WallSide) {
        let Some(i) = self.index(i64::from(x), i64::from(y)) else {
            return;
        };
        self.nodes[i].forced.set(side, true);
        self.nodes[i].walls.set(side, true);
        if let Some(j) = self.neighbour(i, side) {
            self.nodes[j].forced.set(side.opposite(), true);
            self.nodes[j].walls.set(side.opposite(), true);
        }
    }

    /// Randomized depth-first carving from cell 0.
    ///
    /// A forced wall is never removed, but the cell behind it is still
    /// visited, so forced walls can leave the maze disconnected.
    pub fn carve(&mut self, rng: &mut fastrand::Rng) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        visited[0] = true;

        while let Some(&current) = stack.last() {
            let unvisited: Vec<(WallSide, usize)> = WallSide::ALL
                .into_iter()
                .filter_map(|side| self.neighbour(current, side).map(|n| (side, n)))
                .filter(|&(_, n)| !visited[n])
                .collect();

            if unvisited.is_empty() {
                stack.pop();
                continue;
            }

            let (side, next) = unvisited[rng.usize(..unvisited.len())];
            self.remove_wall(current, side);
            visited[next] = true;
            stack.push(next);
        }
    }

    /// Open the entry's right side and the exit's left side.
    pub fn apply_corner_constraints(&mut self) {
        if self.cols < 2 {
            return;
        }
        let (ex, ey) = self.entry();
        let (xx, xy) = self.exit();
        for (x, y, side) in [(ex, ey, WallSide::Right), (xx, xy, WallSide::Left)] {
            if let Some(i) = self.index(i64::from(x), i64::from(y)) {
                self.open_wall(i, side);
            }
        }
    }

    /// Open both sides of every wall that is open on either side.
    ///
    /// Returns the number of walls changed.
    pub fn repair_symmetry(&mut self) -> usize {
        let mut repaired = 0;
        for i in 0..self.nodes.len() {
            for side in [WallSide::Right, WallSide::Bottom] {
                let Some(j) = self.neighbour(i, side) else {
                    continue;
                };
                let here = self.nodes[i].walls.get(side);
                let there = self.nodes[j].walls.get(side.opposite());
                if here != there {
                    self.open_wall(i, side);
                    repaired += 1;
                }
            }
        }
        repaired
    }

    /// Walls whose two sides disagree.
    #[must_use]
    pub fn symmetry_mismatches(&self) -> usize {
        (0..self.nodes.len())
            .flat_map(|i| [WallSide::Right, WallSide::Bottom].map(|side| (i, side)))
            .filter(|&(i, side)| {
                self.neighbour(i, side).is_some_and(|j| {
                    self.nodes[i].walls.get(side) != self.nodes[j].walls.get(side.opposite())
                })
            })
            .count()
    }

    /// Number of cells reachable through open walls.
    #[must_use]
    pub fn reachable_from(&self, (x, y): (u32, u32)) -> usize {
        let Some(start) = self.index(i64::from(x), i64::from(y)) else {
            return 0;
        };
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        seen[start] = true;
        let mut count = 0;

        while let Some(i) = stack.pop() {
            count += 1;
            for side in WallSide::ALL {
                if self.nodes[i].walls.get(side) {
                    continue;
                }
                if let Some(j) = self.neighbour(i, side) {
                    if !seen[j] {
                        seen[j] = true;
                        stack.push(j);
                    }
                }
            }
        }
        count
    }

    /// Whether every cell is reachable from the entry.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.reachable_from(self.entry()) == self.nodes.len()
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let in_bounds =
            (0..i64::from(self.cols)).contains(&x) && (0..i64::from(self.rows)).contains(&y);
        in_bounds.then(|| (y * i64::from(self.cols) + x) as usize)
    }

    fn neighbour(&self, i: usize, side: WallSide) -> Option<usize> {
        let node = &self.nodes[i];
        let (dx, dy) = side.offset();
        self.index(i64::from(node.x) + dx, i64::from(node.y) + dy)
    }

    fn remove_wall(&mut self, i: usize, side: WallSide) {
        let Some(j) = self.neighbour(i, side) else {
            return;
        };
        if self.nodes[i].forced.get(side) || self.nodes[j].forced.get(side.opposite()) {
            return;
        }
        self.nodes[i].walls.set(side, false);
        self.nodes[j].walls.set(side.opposite(), false);
    }

    fn open_wall(&mut self, i: usize, side: WallSide) {
        self.nodes[i].walls.set(side, false);
        if let Some(j) = self.neighbour(i, side) {
            self.nodes[j].walls.set(side.opposite(), false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_degenerate_grid_is_rejected() {
        assert!(matches!(
            Maze::new(0, 4),
            Err(LevelError::DegenerateGrid { cols: 0, rows: 4 })
        ));
    }

    #[test]
    fn test_generated_maze_is_connected_and_symmetric() {
        let mut rng = fastrand::Rng::with_seed(7);
        let maze = Maze::generate(7, 4, &mut rng).expect("valid grid");
        assert!(maze.is_connected());
        assert_eq!(maze.symmetry_mismatches(), 0);
    }

    #[test]
    fn test_outer_boundary_stays_closed() {
        let mut rng = fastrand::Rng::with_seed(11);
        let maze = Maze::generate(5, 3, &mut rng).expect("valid grid");
        for node in maze.nodes() {
            if node.x == 0 {
                assert!(node.walls.left);
            }
            if node.y == 0 {
                assert!(node.walls.top);
            }
            if node.x == maze.cols() - 1 {
                assert!(node.walls.right);
            }
            if node.y == maze.rows() - 1 {
                assert!(node.walls.bottom);
            }
        }
    }

    #[test]
    fn test_corner_constraints_open_entry_and_exit() {
        let mut rng = fastrand::Rng::with_seed(3);
        let maze = Maze::generate(7, 4, &mut rng).expect("valid grid");
        let (ex, ey) = maze.entry();
        let (xx, xy) = maze.exit();
        assert!(!maze.node(ex, ey).expect("entry").walls.right);
        assert!(!maze.node(xx, xy).expect("exit").walls.left);
        assert!(maze.node(ex, ey).expect("entry").exit_mask().contains(ExitMask::RIGHT));
    }

    #[test]
    fn test_forced_wall_survives_carving() {
        let mut maze = Maze::new(2, 1).expect("valid grid");
        maze.force_wall(0, 0, WallSide::Right);
        let mut rng = fastrand::Rng::with_seed(1);
        maze.carve(&mut rng);
        assert!(maze.node(0, 0).expect("cell").walls.right);
        assert!(!maze.is_connected());
    }

    #[test]
    fn test_repair_opens_half_open_walls() {
        let mut maze = Maze::new(2, 2).expect("valid grid");
        maze.nodes[0].walls.right = false;
        assert_eq!(maze.symmetry_mismatches(), 1);
        assert_eq!(maze.repair_symmetry(), 1);
        assert!(!maze.node(1, 0).expect("cell").walls.left);
        assert_eq!(maze.symmetry_mismatches(), 0);
    }

    proptest! {
        #[test]
        fn prop_every_seed_gives_a_connected_maze(
            seed in any::<u64>(),
            cols in 1u32..9,
            rows in 1u32..6,
        ) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let maze = Maze::generate(cols, rows, &mut rng).expect("valid grid");
            prop_assert!(maze.is_connected());
            prop_assert_eq!(maze.symmetry_mismatches(), 0);
        }
    }
}
