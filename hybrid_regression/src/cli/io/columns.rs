use anyhow::{Context, bail};

#[derive(Copy, Clone, Debug)]
pub struct ColumnSelectorParseOpts {
    pub one_indexed: bool,
}

/// A `--x`/`--y`/`--weights` selector: a header name or a column position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSelector {
    Name(String),
    Index(usize),
}

impl ColumnSelector {
    pub fn parse(raw: &str, opts: ColumnSelectorParseOpts) -> anyhow::Result<Self> {
        let s = raw.trim();
        if s.is_empty() {
            bail!("empty column selector");
        }
        let Ok(idx) = s.parse::<usize>() else {
            return Ok(Self::Name(s.to_string()));
        };
        let idx = if opts.one_indexed {
            idx.checked_sub(1)
                .with_context(|| format!("1-based column index {s} is invalid"))?
        } else {
            idx
        };
        Ok(Self::Index(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: ColumnSelectorParseOpts = ColumnSelectorParseOpts { one_indexed: false };
    const ONE: ColumnSelectorParseOpts = ColumnSelectorParseOpts { one_indexed: true };

    #[test]
    fn numbers_are_positions() {
        assert_eq!(ColumnSelector::parse("2", ZERO).unwrap(), ColumnSelector::Index(2));
        assert_eq!(ColumnSelector::parse(" 3 ", ONE).unwrap(), ColumnSelector::Index(2));
        assert!(ColumnSelector::parse("0", ONE).is_err());
    }

    #[test]
    fn everything_else_is_a_name() {
        assert_eq!(ColumnSelector::parse(" temp ", ZERO).unwrap(), ColumnSelector::Name("temp".into()));
        assert!(ColumnSelector::parse("  ", ZERO).is_err());
    }
}
