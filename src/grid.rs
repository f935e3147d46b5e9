//! Uniform spatial grid with fixed per-cell capacity.
//!
//! Rebuilt from scratch every frame (`clear` then `insert`). Each cell holds at
//! most `max_objects_per_cell` handles; extra inserts into a full cell are
//! dropped and counted, which bounds the cost of a query in dense regions at
//! the price of occasionally missing a neighbour.

/// A grid over a `world_width` x `world_height` area split into
/// `cells_x` x `cells_y` cells, storing `Copy` handles (particle indices in the engine).
#[derive(Debug, Clone)]
pub struct SpatialGrid<H: Copy + Default = usize> {
    cells_x: u32,
    cells_y: u32,
    cell_width: f32,
    cell_height: f32,
    max_objects_per_cell: u32,
    // Flat storage: cell `c` owns slots [c * max_objects_per_cell, +cell_counts[c]).
    cell_items: Vec<H>,
    cell_counts: Vec<u32>,
    dropped_inserts: u32,
}

impl<H: Copy + Default> SpatialGrid<H> {
    /// Creates an empty grid. Zero cell counts or capacity are raised to 1.
    pub fn new(cells_x: u32, cells_y: u32, world_width: f32, world_height: f32, max_objects_per_cell: u32) -> Self {
        let cells_x = cells_x.max(1);
        let cells_y = cells_y.max(1);
        let max_objects_per_cell = max_objects_per_cell.max(1);
        let num_cells = cells_x as usize * cells_y as usize;

        Self {
            cells_x,
            cells_y,
            cell_width: world_width / cells_x as f32,
            cell_height: world_height / cells_y as f32,
            max_objects_per_cell,
            cell_items: vec![H::default(); num_cells * max_objects_per_cell as usize],
            cell_counts: vec![0; num_cells],
            dropped_inserts: 0,
        }
    }

    /// Empties every cell. Idempotent.
    pub fn clear(&mut self) {
        self.cell_counts.iter_mut().for_each(|c| *c = 0);
        self.dropped_inserts = 0;
    }

    #[inline(always)]
    fn cell_coord(&self, x: f32, y: f32) -> (u32, u32) {
        // Float to int casts saturate (NaN -> 0), then clamp into the grid.
        let cx = ((x / self.cell_width).floor() as i64).clamp(0, self.cells_x as i64 - 1);
        let cy = ((y / self.cell_height).floor() as i64).clamp(0, self.cells_y as i64 - 1);
        (cx as u32, cy as u32)
    }

    /// Calculates the 1D cell index for a world position, clamped into the grid.
    #[inline(always)]
    pub fn cell_index(&self, x: f32, y: f32) -> usize {
        let (cx, cy) = self.cell_coord(x, y);
        (cy * self.cells_x + cx) as usize
    }

    /// Adds `handle` to the cell containing `(x, y)`.
    /// Returns `false` if the cell was already full and the handle was dropped.
    pub fn insert(&mut self, handle: H, x: f32, y: f32) -> bool {
        let cell = self.cell_index(x, y);
        let count = self.cell_counts[cell];
        if count >= self.max_objects_per_cell {
            self.dropped_inserts += 1;
            return false;
        }
        let slot = cell * self.max_objects_per_cell as usize + count as usize;
        self.cell_items[slot] = handle;
        self.cell_counts[cell] = count + 1;
        true
    }

    /// Calls `f` for every handle stored in a cell that could hold a point
    /// within `radius` of `(x, y)`. Candidates are a superset of the true
    /// neighbours; callers filter by exact distance.
    pub fn for_each_candidate<F>(&self, x: f32, y: f32, radius: f32, mut f: F)
    where
        F: FnMut(H),
    {
        let radius = radius.abs();
        let (min_x, min_y) = self.cell_coord(x - radius, y - radius);
        let (max_x, max_y) = self.cell_coord(x + radius, y + radius);

        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                let cell = (cy * self.cells_x + cx) as usize;
                let start = cell * self.max_objects_per_cell as usize;
                let end = start + self.cell_counts[cell] as usize;
                for &handle in &self.cell_items[start..end] {
                    f(handle);
                }
            }
        }
    }

    /// Collects the candidates around `(x, y)` into `out` (cleared first).
    pub fn query_neighbors_into(&self, x: f32, y: f32, radius: f32, out: &mut Vec<H>) {
        out.clear();
        self.for_each_candidate(x, y, radius, |h| out.push(h));
    }

    /// Returns the candidates around `(x, y)`.
    pub fn query_neighbors(&self, x: f32, y: f32, radius: f32) -> Vec<H> {
        let mut out = Vec::with_capacity(self.max_objects_per_cell as usize * 9);
        self.query_neighbors_into(x, y, radius, &mut out);
        out
    }

    /// Number of handles stored in `cell`.
    pub fn cell_len(&self, cell: usize) -> usize {
        self.cell_counts.get(cell).copied().unwrap_or(0) as usize
    }

    /// Total number of stored handles.
    pub fn len(&self) -> usize {
        self.cell_counts.iter().map(|&c| c as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_counts.iter().all(|&c| c == 0)
    }

    /// Inserts dropped since the last `clear`.
    pub fn dropped_inserts(&self) -> u32 {
        self.dropped_inserts
    }

    pub fn num_cells(&self) -> usize {
        self.cell_counts.len()
    }
}
