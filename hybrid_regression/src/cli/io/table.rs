use anyhow::{Context, bail};

use super::columns::ColumnSelector;

/// Column-major numeric table as loaded from disk.
#[derive(Debug)]
pub struct Table {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
    pub n_rows: usize,
    pub n_cols: usize,
}

impl Table {
    pub fn new(headers: Vec<String>, columns: Vec<Vec<f64>>) -> anyhow::Result<Self> {
        if headers.len() != columns.len() {
            bail!(
                "header count {} does not match column count {}",
                headers.len(),
                columns.len()
            );
        }
        let n_rows = columns.first().map_or(0, Vec::len);
        if let Some((name, col)) = headers.iter().zip(&columns).find(|(_, c)| c.len() != n_rows) {
            bail!("column {name} has {} rows but expected {n_rows}", col.len());
        }
        Ok(Self {
            n_cols: columns.len(),
            n_rows,
            headers,
            columns,
        })
    }

    pub fn column_by_index(&self, idx: usize) -> anyhow::Result<&[f64]> {
        self.columns
            .get(idx)
            .map(Vec::as_slice)
            .with_context(|| format!("column index {idx} out of bounds (n_cols={})", self.n_cols))
    }

    /// Exact header match first, then a unique case-insensitive one.
    pub fn column_index(&self, selector: &ColumnSelector) -> anyhow::Result<usize> {
        match selector {
            ColumnSelector::Index(i) if *i < self.n_cols => Ok(*i),
            ColumnSelector::Index(i) => bail!("column index {i} out of bounds (n_cols={})", self.n_cols),
            ColumnSelector::Name(name) => {
                if let Some(i) = self.headers.iter().position(|h| h == name) {
                    return Ok(i);
                }
                let mut matches = self
                    .headers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.eq_ignore_ascii_case(name))
                    .map(|(i, _)| i);
                match (matches.next(), matches.next()) {
                    (Some(i), None) => Ok(i),
                    (None, _) => bail!("unknown column name {name:?}"),
                    (Some(_), Some(_)) => bail!("ambiguous column name {name:?} (multiple case-insensitive matches)"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Table::new(vec!["a".into(), "b".into()], vec![vec![1.0], vec![]]).err().unwrap();
        assert_eq!(err.to_string(), "column b has 0 rows but expected 1");
    }

    #[test]
    fn case_insensitive_lookup_must_be_unique() {
        let t = Table::new(vec!["X".into(), "x2".into(), "Y".into()], vec![vec![]; 3]).unwrap();
        assert_eq!(t.column_index(&ColumnSelector::Name("y".into())).unwrap(), 2);
        assert!(t.column_index(&ColumnSelector::Index(3)).is_err());

        let dup = Table::new(vec!["a".into(), "A".into()], vec![vec![]; 2]).unwrap();
        assert!(dup.column_index(&ColumnSelector::Name("a".into())).is_ok());
        assert!(dup.column_index(&ColumnSelector::Name("a ".trim().to_uppercase())).is_ok());
        let dup = Table::new(vec!["ab".into(), "AB".into()], vec![vec![]; 2]).unwrap();
        assert!(dup.column_index(&ColumnSelector::Name("Ab".into())).is_err());
    }
}
