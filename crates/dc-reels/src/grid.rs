//! Reel grid: owns every reel strip and the active symbol pool

use std::sync::Arc;

use dc_core::{ProbabilityModel, RandomSource};
use serde::{Deserialize, Serialize};

use crate::config::{GridConfig, GridLayout};
use crate::reel::{ReelState, ReelStrip};
use crate::symbols::{SymbolHandle, SymbolPool};

/// Render-ready view of one reel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelView {
    pub index: usize,
    /// Symbols in the visible slots, top first
    pub visible: Vec<SymbolHandle>,
    pub state: ReelState,
    pub progress: f64,
}

/// Collection of reels laid out on one or two rows
pub struct ReelGrid {
    config: GridConfig,
    /// Everything that was loaded
    loaded: Arc<SymbolPool>,
    /// The `symbols_to_use` prefix actually drawn from
    active: Arc<SymbolPool>,
    reels: Vec<ReelStrip>,
}

impl ReelGrid {
    pub fn new(config: GridConfig, pool: SymbolPool, rng: &mut dyn RandomSource) -> Self {
        let active = Arc::new(pool.restricted(config.symbols_to_use()));
        let mut grid = Self {
            config,
            loaded: Arc::new(pool),
            active,
            reels: Vec::new(),
        };
        grid.rebuild(rng);
        grid
    }

    /// Apply a new shape and rebuild every reel
    pub fn configure(&mut self, config: GridConfig, rng: &mut dyn RandomSource) {
        self.config = config;
        self.active = Arc::new(self.loaded.restricted(config.symbols_to_use()));
        self.rebuild(rng);
    }

    /// Replace the symbol pool and refill every reel
    pub fn set_symbols(&mut self, pool: SymbolPool, rng: &mut dyn RandomSource) {
        self.active = Arc::new(pool.restricted(self.config.symbols_to_use()));
        self.loaded = Arc::new(pool);
        self.rebuild(rng);
    }

    fn rebuild(&mut self, rng: &mut dyn RandomSource) {
        let columns = self.config.columns() as usize;
        let items = self.config.items_per_column() as usize;
        let pool_size = self.active.len();

        self.reels = (0..columns)
            .map(|index| ReelStrip::new(index, items, pool_size, &mut *rng))
            .collect();

        log::debug!(
            "Grid rebuilt: {} columns x {} rows, {} items per column, {} symbols",
            columns,
            self.config.rows(),
            items,
            pool_size
        );
    }

    /// Force-stop every reel
    pub fn stop_all(&mut self) {
        for reel in &mut self.reels {
            reel.stop();
        }
    }

    /// Top index of every reel, in column order
    pub fn tops(&self) -> Vec<usize> {
        self.reels.iter().filter_map(ReelStrip::current_top).collect()
    }

    pub fn views(&self) -> Vec<ReelView> {
        self.reels
            .iter()
            .map(|reel| ReelView {
                index: reel.index(),
                visible: reel
                    .visible()
                    .into_iter()
                    .filter_map(|i| self.active.get(i).cloned())
                    .collect(),
                state: reel.state(),
                progress: reel.progress(),
            })
            .collect()
    }

    pub fn probability(&self, model: &dyn ProbabilityModel) -> f64 {
        if self.active.is_empty() {
            return 0.0;
        }
        model.calculate_win_probability(
            self.config.columns() as i32,
            self.config.rows() as i32,
            self.active.len() as i32,
        )
    }

    pub fn layout(&self) -> GridLayout {
        self.config.layout()
    }

    pub fn config(&self) -> GridConfig {
        self.config
    }

    pub fn active_pool(&self) -> &SymbolPool {
        &self.active
    }

    pub fn loaded_pool(&self) -> &SymbolPool {
        &self.loaded
    }

    pub fn symbol_count(&self) -> usize {
        self.active.len()
    }

    pub fn reels(&self) -> &[ReelStrip] {
        &self.reels
    }

    pub fn reel_mut(&mut self, index: usize) -> Option<&mut ReelStrip> {
        self.reels.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.reels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dc_core::{DefaultProbabilityModel, ScriptedRandomSource};

    fn pool(n: usize) -> SymbolPool {
        SymbolPool::bundled().restricted(n as u32)
    }

    #[test]
    fn test_grid_builds_one_reel_per_column() {
        let mut rng = ScriptedRandomSource::new(vec![0, 1, 2, 3]);
        let grid = ReelGrid::new(GridConfig::new(4, 6, 0).unwrap(), pool(4), &mut rng);
        assert_eq!(grid.len(), 4);
        assert!(grid.reels().iter().all(|r| r.window().len() == 6));
        assert_eq!(grid.tops().len(), 4);
    }

    #[test]
    fn test_symbols_to_use_restricts_draws() {
        let mut rng = ScriptedRandomSource::new(vec![0, 5, 7, 2]);
        let grid = ReelGrid::new(GridConfig::new(3, 6, 2).unwrap(), pool(8), &mut rng);
        assert_eq!(grid.symbol_count(), 2);
        assert_eq!(grid.loaded_pool().len(), 8);
        assert!(
            grid.reels()
                .iter()
                .all(|r| r.window().iter().all(|&i| i < 2))
        );
    }

    #[test]
    fn test_probability_from_grid() {
        let mut rng = ScriptedRandomSource::constant(0);
        let model = DefaultProbabilityModel;

        let grid = ReelGrid::new(GridConfig::new(3, 6, 0).unwrap(), pool(4), &mut rng);
        assert_relative_eq!(grid.probability(&model), 0.0625);

        let grid = ReelGrid::new(GridConfig::new(5, 6, 0).unwrap(), pool(6), &mut rng);
        assert_eq!(grid.config().rows(), 1);
        assert_relative_eq!(grid.probability(&model), 1.0 / 1296.0, max_relative = 1e-12);

        let empty = ReelGrid::new(GridConfig::default(), SymbolPool::empty(), &mut rng);
        assert_eq!(empty.probability(&model), 0.0);
    }

    #[test]
    fn test_configure_and_set_symbols_rebuild() {
        let mut rng = ScriptedRandomSource::new(vec![1, 2, 3]);
        let mut grid = ReelGrid::new(GridConfig::default(), pool(4), &mut rng);

        grid.configure(GridConfig::new(7, 4, 0).unwrap(), &mut rng);
        assert_eq!(grid.len(), 7);
        assert_eq!(grid.layout().rows[0].len(), 4);
        assert_eq!(grid.layout().rows[1].len(), 3);

        grid.set_symbols(SymbolPool::empty(), &mut rng);
        assert_eq!(grid.symbol_count(), 0);
        assert!(grid.tops().is_empty());
    }

    #[test]
    fn test_views_map_to_handles() {
        let mut rng = ScriptedRandomSource::new(vec![3, 2, 1]);
        let grid = ReelGrid::new(GridConfig::new(1, 3, 0).unwrap(), pool(4), &mut rng);
        let views = grid.views();
        let names: Vec<_> = views[0].visible.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["plum", "orange", "lemon"]);
        assert_eq!(views[0].state, ReelState::Idle);
    }
}
