use std::collections::{HashMap, HashSet};

/// A cell; `None` is a null/missing value.
pub type Value = Option<String>;

/// An in-memory table with named, index-addressable columns. All cells are
/// held as text; typing is the concern of whoever consumes a column.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Table {

    pub fn new(columns: Vec<String>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();
        Table {
            columns,
            index,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with no rows counts as empty even if it has a header.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Rows shorter than the header are padded with nulls; longer rows are
    /// truncated.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let position = self.column_index(column)?;
        self.rows.get(row)?.get(position)?.as_deref()
    }

    /// One whole column, row order preserved. A missing column reads as
    /// all nulls so callers do not have to branch on presence.
    pub fn column_values(&self, column: &str) -> Vec<Option<&str>> {
        match self.column_index(column) {
            Some(position) => self.rows.iter().map(|row| row[position].as_deref()).collect(),
            None => vec![None; self.rows.len()],
        }
    }

    /// Projects to the given (source, output) columns. Sources that do not
    /// exist are skipped rather than erroring.
    pub fn select(&self, columns: &[(&str, &str)]) -> Table {
        let picked: Vec<(usize, &str)> = columns
            .iter()
            .filter_map(|(source, output)| self.column_index(source).map(|i| (i, *output)))
            .collect();

        let mut out = Table::new(picked.iter().map(|(_, name)| (*name).to_string()).collect());
        for row in &self.rows {
            out.rows.push(picked.iter().map(|(i, _)| row[*i].clone()).collect());
        }
        out
    }

    /// Keeps the first row per distinct non-null value of `key`. Later
    /// duplicates and rows with a null key are dropped.
    pub fn dedup_by(&self, key: &str) -> Table {
        let mut out = Table::new(self.columns.clone());
        let Some(position) = self.column_index(key) else {
            return out;
        };

        let mut seen = HashSet::new();
        for row in &self.rows {
            if let Some(value) = row[position].as_deref() {
                if seen.insert(value.to_string()) {
                    out.rows.push(row.clone());
                }
            }
        }
        out
    }

    /// Left join: attaches `right`'s columns under `prefix`, matching
    /// `left_on` against `right_on`. The first matching right row wins and
    /// the joined-in key column is not repeated. Joining against an empty
    /// or keyless right table returns the left table unchanged.
    pub fn left_join_prefixed(
        &self,
        right: &Table,
        left_on: &str,
        right_on: &str,
        prefix: &str,
    ) -> Table {
        let Some(left_key) = self.column_index(left_on) else {
            return self.clone();
        };
        let Some(right_key) = right.column_index(right_on) else {
            return self.clone();
        };
        if right.is_empty() {
            return self.clone();
        }

        let mut lookup: HashMap<&str, &Vec<Value>> = HashMap::new();
        for row in &right.rows {
            if let Some(key) = row[right_key].as_deref() {
                lookup.entry(key).or_insert(row);
            }
        }

        let attached: Vec<usize> = (0..right.columns.len()).filter(|i| *i != right_key).collect();
        let mut columns = self.columns.clone();
        for &position in &attached {
            columns.push(format!("{}{}", prefix, right.columns[position]));
        }

        let mut out = Table::new(columns);
        for row in &self.rows {
            let matched = row[left_key].as_deref().and_then(|key| lookup.get(key));
            let mut joined = row.clone();
            for &position in &attached {
                joined.push(matched.and_then(|right_row| right_row[position].clone()));
            }
            out.rows.push(joined);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<Value> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some((*v).to_string()) })
            .collect()
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| (*c).to_string()).collect());
        for r in rows {
            t.push_row(row(r));
        }
        t
    }

    #[test]
    fn select_skips_missing_sources() {
        let t = table(&["a", "b"], &[&["1", "2"]]);
        let picked = t.select(&[("a", "x"), ("missing", "y")]);

        assert_eq!(picked.columns(), &["x".to_string()]);
        assert_eq!(picked.value(0, "x"), Some("1"));
    }

    #[test]
    fn dedup_keeps_first_occurrence_and_drops_null_keys() {
        let t = table(
            &["id", "name"],
            &[&["A", "first"], &["B", "b"], &["A", "second"], &["", "nokey"]],
        );
        let distinct = t.dedup_by("id");

        assert_eq!(distinct.len(), 2);
        assert_eq!(distinct.value(0, "name"), Some("first"));
        assert_eq!(distinct.value(1, "name"), Some("b"));
    }

    #[test]
    fn left_join_attaches_prefixed_columns_first_match_wins() {
        let left = table(&["id", "p"], &[&["1", "P1"], &["2", "P9"]]);
        let right = table(&["p_id", "name"], &[&["P1", "Ontario"], &["P1", "dupe"]]);

        let joined = left.left_join_prefixed(&right, "p", "p_id", "province_");

        assert_eq!(joined.columns(), &["id", "p", "province_name"]);
        assert_eq!(joined.value(0, "province_name"), Some("Ontario"));
        // Unmatched left rows keep their row with null attachments.
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.value(1, "province_name"), None);
    }

    #[test]
    fn joining_empty_right_table_is_identity() {
        let left = table(&["id"], &[&["1"]]);
        let joined = left.left_join_prefixed(&Table::empty(), "id", "id", "x_");

        assert_eq!(joined.columns(), left.columns());
        assert_eq!(joined.len(), 1);
    }

    #[test]
    fn column_values_of_missing_column_are_all_null() {
        let t = table(&["a"], &[&["1"], &["2"]]);
        assert_eq!(t.column_values("nope"), vec![None, None]);
    }
}
