//! dc-core: Shared types, traits, and pure game math for Dynamic Casino
//!
//! This crate provides the foundational pieces used by the reel engine:
//! - Error taxonomy (configuration errors, step failures)
//! - Pluggable random sources
//! - Analytic win probability
//! - Win evaluation over settled reel tops

mod error;
mod evaluator;
mod probability;
mod random;

pub use error::*;
pub use evaluator::*;
pub use probability::*;
pub use random::*;

/// Number of symbol slots a reel shows at once
pub const VISIBLE_SLOTS: usize = 3;

/// Supported column range
pub const MIN_COLUMNS: u32 = 1;
pub const MAX_COLUMNS: u32 = 10;

/// Columns above this value are laid out on two rows
pub const SINGLE_ROW_MAX_COLUMNS: u32 = 5;

/// Derive the number of layout rows from the column count.
///
/// Up to five columns fit on one row, anything wider is split over two.
#[inline]
pub fn rows_for_columns(columns: u32) -> u32 {
    if columns <= SINGLE_ROW_MAX_COLUMNS { 1 } else { 2 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_for_columns() {
        assert_eq!(rows_for_columns(1), 1);
        assert_eq!(rows_for_columns(5), 1);
        assert_eq!(rows_for_columns(6), 2);
        assert_eq!(rows_for_columns(10), 2);
    }
}
