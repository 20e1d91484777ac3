//! dc-reels: Reel engine for Dynamic Casino
//!
//! ## Architecture
//!
//! ```text
//! GameSettings ─► GridConfig ─► ReelGrid ─► ReelStrip × columns
//!                                   ▲
//! SymbolPool (images dir / bundled) ┘
//!
//! SpinCoordinator ── tokio tasks ──► SpinEvent stream (dc-stage)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dc_core::DefaultRandomSource;
//! use dc_reels::{GameSettings, SpinCoordinator, SymbolPool};
//!
//! let settings = GameSettings::default();
//! let pool = SymbolPool::load_or_bundled(&settings.images_directory);
//! let coordinator = SpinCoordinator::new(settings, pool, Box::new(DefaultRandomSource::new()))?;
//!
//! if let Some(spin) = coordinator.start_spin() {
//!     let outcome = spin.wait().await;
//! }
//! ```

mod activity;
mod config;
mod coordinator;
mod error;
mod grid;
mod reel;
mod symbols;
mod timing;

pub use activity::*;
pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use grid::*;
pub use reel::*;
pub use symbols::*;
pub use timing::*;
