//! Grid packing for namespace containers

/// Row-major grid the namespace containers are placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
}

impl GridLayout {
    /// Pack `cells` items into at most `columns` columns.
    ///
    /// `columns == 0` stacks everything in a single column. The column
    /// count never exceeds the number of cells, so a lone namespace is not
    /// stretched across empty cells.
    pub fn pack(cells: usize, columns: usize) -> Self {
        if cells == 0 {
            return Self { columns: 0, rows: 0 };
        }

        let columns = columns.clamp(1, cells);
        Self {
            columns,
            rows: cells.div_ceil(columns),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns == 0
    }

    /// (row, column) of the cell at `index`
    pub fn position(&self, index: usize) -> (usize, usize) {
        if self.columns == 0 {
            return (0, 0);
        }
        (index / self.columns, index % self.columns)
    }
}
