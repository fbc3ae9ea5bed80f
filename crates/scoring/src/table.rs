// crates/scoring/src/table.rs
use std::collections::{BTreeMap, BTreeSet};

/// Sparse row x column grid of f64 cells. An absent cell is null.
///
/// Rows and columns are ordered, so every iteration (and every floating point
/// sum built from one) happens in the same order on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R: Ord, C: Ord> {
    columns: BTreeSet<C>,
    rows: BTreeMap<R, BTreeMap<C, f64>>,
}

impl<R: Ord, C: Ord> Default for Table<R, C> {
    fn default() -> Self {
        Self {
            columns: BTreeSet::new(),
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Ord + Clone, C: Ord + Clone> Table<R, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, column: C) {
        self.columns.insert(column);
    }

    /// Register a row with no non-null cells yet
    pub fn add_row(&mut self, row: R) {
        self.rows.entry(row).or_default();
    }

    pub fn set(&mut self, row: R, column: C, value: Option<f64>) {
        let cells = self.rows.entry(row).or_default();
        match value {
            Some(v) => {
                cells.insert(column.clone(), v);
            }
            None => {
                cells.remove(&column);
            }
        }
        self.columns.insert(column);
    }

    /// Add into a cell; a null cell starts from zero
    pub fn accumulate(&mut self, row: R, column: C, value: f64) {
        *self
            .rows
            .entry(row)
            .or_default()
            .entry(column.clone())
            .or_insert(0.0) += value;
        self.columns.insert(column);
    }

    pub fn get(&self, row: &R, column: &C) -> Option<f64> {
        self.rows.get(row)?.get(column).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.rows.keys()
    }

    pub fn columns(&self) -> impl Iterator<Item = &C> {
        self.columns.iter()
    }

    pub fn has_column(&self, column: &C) -> bool {
        self.columns.contains(column)
    }

    /// Non-null cells of a row, in column order
    pub fn cells<'a>(&'a self, row: &R) -> impl Iterator<Item = (&'a C, f64)> + 'a {
        self.rows
            .get(row)
            .into_iter()
            .flat_map(|cells| cells.iter().map(|(c, v)| (c, *v)))
    }

    /// One entry per row, in row order, None where the cell is null
    pub fn column(&self, column: &C) -> Vec<Option<f64>> {
        self.rows
            .values()
            .map(|cells| cells.get(column).copied())
            .collect()
    }

    /// Apply `f` to every non-null cell of a column
    pub fn update_column(&mut self, column: &C, mut f: impl FnMut(f64) -> f64) {
        for cells in self.rows.values_mut() {
            if let Some(v) = cells.get_mut(column) {
                *v = f(*v);
            }
        }
    }

    /// Replace a column with one value per row, in row order
    pub fn replace_column(&mut self, column: &C, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.rows.len());
        for (cells, value) in self.rows.values_mut().zip(values) {
            match value {
                Some(v) => {
                    cells.insert(column.clone(), v);
                }
                None => {
                    cells.remove(column);
                }
            }
        }
        self.columns.insert(column.clone());
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count of non-null cells across the table
    pub fn num_values(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_sums_duplicates() {
        let mut t: Table<&str, &str> = Table::new();
        t.accumulate("p1", "tvl", 10.0);
        t.accumulate("p1", "tvl", 5.0);
        assert_eq!(t.get(&"p1", &"tvl"), Some(15.0));
        assert_eq!(t.get(&"p1", &"fees"), None);
    }

    #[test]
    fn test_rows_without_cells_are_kept() {
        let mut t: Table<&str, &str> = Table::new();
        t.add_row("p1");
        t.add_column("tvl");
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.column(&"tvl"), vec![None]);
        assert_eq!(t.cells(&"p1").count(), 0);
    }

    #[test]
    fn test_set_none_nulls_cell() {
        let mut t: Table<&str, &str> = Table::new();
        t.set("p1", "tvl", Some(3.0));
        t.set("p1", "tvl", None);
        assert_eq!(t.get(&"p1", &"tvl"), None);
        assert!(t.has_column(&"tvl"));
        assert_eq!(t.num_values(), 0);
    }

    #[test]
    fn test_update_column_skips_nulls() {
        let mut t: Table<&str, &str> = Table::new();
        t.set("p1", "a", Some(2.0));
        t.add_row("p2");
        t.update_column(&"a", |v| v * 10.0);
        assert_eq!(t.column(&"a"), vec![Some(20.0), None]);
    }

    #[test]
    fn test_replace_column_in_row_order() {
        let mut t: Table<&str, &str> = Table::new();
        t.add_row("b");
        t.add_row("a");
        t.replace_column(&"x", vec![Some(1.0), None]);
        assert_eq!(t.get(&"a", &"x"), Some(1.0));
        assert_eq!(t.get(&"b", &"x"), None);
    }
}
