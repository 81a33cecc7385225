use super::DataError;

// ---------------------------------------------------------------------------
// Table – named numeric columns over a dense row-major matrix
// ---------------------------------------------------------------------------

/// An in-memory numeric table, one `f64` per (row, column) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Ordered column names, matching the cell order inside each row.
    column_names: Vec<String>,
    /// Row-major cells: `values[row * n_cols + col]`.
    values: Vec<f64>,
    n_rows: usize,
}

impl Table {
    /// Build a table from whole rows. Every row must have one value per column.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, DataError> {
        let n_cols = column_names.len();
        let n_rows = rows.len();
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(DataError::parse(format!(
                    "row {row_no} has {} values but the header names {n_cols} columns",
                    row.len()
                )));
            }
            values.extend(row);
        }
        Ok(Table {
            column_names,
            values,
            n_rows,
        })
    }

    /// Build a table from whole columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, DataError> {
        let n_rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(DataError::parse(format!(
                "column '{name}' has {} values, expected {n_rows}",
                col.len()
            )));
        }
        let n_cols = columns.len();
        let mut values = vec![0.0; n_rows * n_cols];
        for (col_idx, (_, col)) in columns.iter().enumerate() {
            for (row, v) in col.iter().enumerate() {
                values[row * n_cols + col_idx] = *v;
            }
        }
        Ok(Table {
            column_names: columns.into_iter().map(|(name, _)| name).collect(),
            values,
            n_rows,
        })
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.column_names.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// One row as a slice, in column order.
    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }

    /// A single cell.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols() + col]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |r| self.row(r))
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    /// Remove a column from the table and return its values.
    pub fn pop_column(&mut self, name: &str) -> Result<Vec<f64>, DataError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;
        let n_cols = self.n_cols();

        let mut popped = Vec::with_capacity(self.n_rows);
        let mut kept = Vec::with_capacity(self.n_rows * (n_cols - 1));
        for (i, v) in self.values.iter().enumerate() {
            if i % n_cols == idx {
                popped.push(*v);
            } else {
                kept.push(*v);
            }
        }

        self.values = kept;
        self.column_names.remove(idx);
        Ok(popped)
    }

    /// A new table holding the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let mut values = Vec::with_capacity(rows.len() * self.n_cols());
        for &r in rows {
            values.extend_from_slice(self.row(r));
        }
        Table {
            column_names: self.column_names.clone(),
            values,
            n_rows: rows.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – features with an aligned regression target
// ---------------------------------------------------------------------------

/// Feature table plus the target column popped out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Table,
    pub target: Vec<f64>,
    pub target_name: String,
}

impl Dataset {
    /// Split `target` off the loaded table; the remaining columns are features.
    pub fn from_table(mut table: Table, target: &str) -> Result<Self, DataError> {
        let target_values = table.pop_column(target)?;
        Ok(Dataset {
            features: table,
            target: target_values,
            target_name: target.to_string(),
        })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Feature column names in training order.
    pub fn feature_names(&self) -> &[String] {
        self.features.column_names()
    }

    /// Subset of rows, features and target kept aligned.
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select_rows(rows),
            target: rows.iter().map(|&r| self.target[r]).collect(),
            target_name: self.target_name.clone(),
        }
    }
}
