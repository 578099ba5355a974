use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic name source: `prefix` followed by 1, 2, 3, ...
///
/// Counters live for the whole process and are never reset; the compiler
/// uses minted names as parameter identifiers, so a repeated name would
/// alias two distinct parameters.
#[derive(Debug)]
pub struct NameCounter {
    prefix: &'static str,
    next: AtomicU64,
}

impl NameCounter {
    pub const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn mint(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }

    /// Number of names handed out so far.
    pub fn minted(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

static CONSTANTS: NameCounter = NameCounter::new("c");
static VARIABLES: NameCounter = NameCounter::new("x");

pub fn constant_counter() -> &'static NameCounter {
    &CONSTANTS
}

pub fn variable_counter() -> &'static NameCounter {
    &VARIABLES
}

/// Mints a fresh constant name (`c1`, `c2`, ...).
pub fn new_constant() -> String {
    CONSTANTS.mint()
}

/// Mints a fresh variable name (`x1`, `x2`, ...).
pub fn new_variable() -> String {
    VARIABLES.mint()
}

/// `c[1-9][0-9]*`, matched against a whole identifier.
pub fn is_constant_name(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('c') else {
        return false;
    };
    let mut chars = rest.chars();
    matches!(chars.next(), Some('1'..='9')) && chars.all(|ch| ch.is_ascii_digit())
}
