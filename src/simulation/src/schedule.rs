//! Release timing.
//!
//! Every bracket gets its own release event. The order is fixed: layers
//! from the top of the stack down to 1, inside a layer rows ascending and
//! inside a row columns ascending. The n-th event fires at
//! `n * release_step_ms`.
use itertools::iproduct;

use crate::config::StackConfig;

/// One release event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    /// 1-based position in the release order.
    pub index: usize,
    pub layer: usize,
    pub row: usize,
    pub col: usize,
    pub time_ms: u64,
}

impl Release {
    pub fn new(config: &StackConfig, layer: usize, row: usize, col: usize) -> Self {
        let index = release_index(config, layer, row, col);
        Self {
            index,
            layer,
            row,
            col,
            time_ms: index as u64 * config.release_step_ms,
        }
    }

    /// Node name of the control signal that drives this release.
    pub fn control_node(&self) -> String {
        control_node(self.layer, self.row, self.col)
    }
}

pub fn control_node(layer: usize, row: usize, col: usize) -> String {
    format!("CTRL_L{}_R{}_C{}", layer, row, col)
}

/// Position of the bracket `(layer, row, col)` in the release order.
///
/// All three coordinates are 1-based and inside the stack.
pub fn release_index(config: &StackConfig, layer: usize, row: usize, col: usize) -> usize {
    debug_assert!(
        (1..=config.layers).contains(&layer)
            && (1..=config.rows).contains(&row)
            && (1..=config.cols).contains(&col),
        "bracket ({}, {}, {}) outside of the {}x{}x{} stack",
        layer,
        row,
        col,
        config.rows,
        config.cols,
        config.layers
    );
    (config.layers - layer) * config.rows * config.cols + (row - 1) * config.cols + col
}

pub fn release_time_ms(config: &StackConfig, layer: usize, row: usize, col: usize) -> u64 {
    release_index(config, layer, row, col) as u64 * config.release_step_ms
}

/// All release events in firing order.
pub fn schedule(config: &StackConfig) -> Vec<Release> {
    iproduct!((1..=config.layers).rev(), 1..=config.rows, 1..=config.cols)
        .map(|(layer, row, col)| Release::new(config, layer, row, col))
        .collect()
}

/// Satellite entry for the release listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteRelease {
    pub id: String,
    pub column: usize,
    pub row: usize,
    pub layer: usize,
    pub release_time_ms: u64,
}

/// The listing of all satellites, layer by layer from the bottom.
///
/// Ids count in listing order, the release times are the ones the control
/// signals use.
pub fn satellite_listing(config: &StackConfig) -> Vec<SatelliteRelease> {
    iproduct!(1..=config.layers, 1..=config.rows, 1..=config.cols)
        .enumerate()
        .map(|(i, (layer, row, col))| SatelliteRelease {
            id: format!("SAT-{:03}", i + 1),
            column: col,
            row,
            layer,
            release_time_ms: release_time_ms(config, layer, row, col),
        })
        .collect()
}
