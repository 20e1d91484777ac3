//! Analytic win probability
//!
//! A row wins when every column shows the same symbol. With uniform,
//! independent draws over `symbol_count` symbols:
//!
//! ```text
//! p_row = (1 / symbol_count) ^ (columns - 1)
//! p_win = 1 - (1 - p_row) ^ rows
//! ```

/// Win probability model
pub trait ProbabilityModel: Send + Sync {
    /// Probability in `[0, 1]` that a spin wins.
    ///
    /// Any non-positive input yields `0.0`.
    fn calculate_win_probability(&self, columns: i32, rows: i32, symbol_count: i32) -> f64;
}

/// Uniform-draw, all-columns-equal model
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProbabilityModel;

impl ProbabilityModel for DefaultProbabilityModel {
    fn calculate_win_probability(&self, columns: i32, rows: i32, symbol_count: i32) -> f64 {
        calculate_win_probability(columns, rows, symbol_count)
    }
}

/// See [`ProbabilityModel::calculate_win_probability`].
pub fn calculate_win_probability(columns: i32, rows: i32, symbol_count: i32) -> f64 {
    if columns <= 0 || rows <= 0 || symbol_count <= 0 {
        return 0.0;
    }

    // columns == 1 gives p_row == 1: a single column always "matches"
    let p_row = (1.0 / symbol_count as f64).powi(columns - 1);
    1.0 - (1.0 - p_row).powi(rows)
}

/// Render a probability as a percentage with four decimals, e.g. `6.2500%`
pub fn format_probability(probability: f64) -> String {
    format!("{:.4}%", probability * 100.0)
}
