//! The stack configuration.
//!
//! A stack is a `rows` x `cols` grid of columns, every column carries
//! `layers` satellites and every satellite four brackets. All counts the
//! netlist, the scheduler and the decoder use are derived from this struct.
//!
//! # Example:
//!
//! ```
//! use simulation::StackConfig;
//!
//! let config = StackConfig::from_yaml("size: 3\nlayers: 2\n").unwrap();
//! assert_eq!(9, config.derived().columns);
//! assert_eq!((2, 2), config.column_position(5));
//! ```
use log::debug;
use yaml_rust::{Yaml, YamlLoader};

use crate::{error::Error, units};

/// Brackets per satellite, also the number of probes per column.
pub const BRACKETS_PER_SATELLITE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct StackConfig {
    pub rows: usize,
    pub cols: usize,
    pub layers: usize,
    pub release_step_ms: u64,
    pub supply_voltage: f64,
    pub resistor_value: String,
}

/// Counts derived from a [`StackConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackDerived {
    pub columns: usize,
    pub satellites: usize,
    pub brackets: usize,
    pub releases: usize,
    pub sim_end_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            rows: 3,
            cols: 3,
            layers: 3,
            release_step_ms: 10,
            supply_voltage: 5.0,
            resistor_value: String::from("10k"),
        }
    }
}

impl StackConfig {
    pub fn new(
        rows: usize,
        cols: usize,
        layers: usize,
        release_step_ms: u64,
        supply_voltage: f64,
        resistor_value: &str,
    ) -> Self {
        Self {
            rows,
            cols,
            layers,
            release_step_ms,
            supply_voltage,
            resistor_value: resistor_value.to_string(),
        }
    }

    /// A square grid, `size` columns in each direction.
    pub fn square(
        size: usize,
        layers: usize,
        release_step_ms: u64,
        supply_voltage: f64,
        resistor_value: &str,
    ) -> Self {
        Self::new(size, size, layers, release_step_ms, supply_voltage, resistor_value)
    }

    /// Reject configurations that can not produce a netlist.
    pub fn validate(&self) -> Result<(), Error> {
        if self.rows == 0 || self.cols == 0 || self.layers == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "rows, cols and layers must be at least 1 (got {}x{}x{})",
                self.rows, self.cols, self.layers
            )));
        }
        if self.release_step_ms == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "release step must be positive",
            )));
        }
        if !self.supply_voltage.is_finite() || self.supply_voltage <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "supply voltage must be positive (got {})",
                self.supply_voltage
            )));
        }
        match self.resistance() {
            Some(ohms) if ohms.is_finite() && ohms > 0.0 => {}
            _ => {
                return Err(Error::InvalidConfiguration(format!(
                    "resistor value must be a positive value (got `{}`)",
                    self.resistor_value
                )))
            }
        }
        let releases = self
            .rows
            .checked_mul(self.cols)
            .and_then(|columns| columns.checked_mul(self.layers));
        let brackets = releases.and_then(|releases| releases.checked_mul(BRACKETS_PER_SATELLITE));
        let sim_end = releases
            .and_then(|releases| u64::try_from(releases).ok())
            .and_then(|releases| releases.checked_add(1))
            .and_then(|steps| steps.checked_mul(self.release_step_ms));
        if brackets.is_none() || sim_end.is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "stack {}x{}x{} with {} ms release step is too large",
                self.rows, self.cols, self.layers, self.release_step_ms
            )));
        }
        Ok(())
    }

    /// The resistor value in ohms.
    pub fn resistance(&self) -> Option<f64> {
        units::parse_value(&self.resistor_value)
    }

    pub fn derived(&self) -> StackDerived {
        let columns = self.rows * self.cols;
        let satellites = columns * self.layers;
        let releases = satellites;
        StackDerived {
            columns,
            satellites,
            brackets: satellites * BRACKETS_PER_SATELLITE,
            releases,
            sim_end_ms: (releases as u64 + 1) * self.release_step_ms,
        }
    }

    /// 1-based column number of `(row, col)`, counted row-major.
    ///
    /// `row` and `col` are 1-based and inside the grid.
    pub fn column_number(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            (1..=self.rows).contains(&row) && (1..=self.cols).contains(&col),
            "column ({}, {}) outside of the {}x{} grid",
            row,
            col,
            self.rows,
            self.cols
        );
        (row - 1) * self.cols + col
    }

    /// Inverse of [`StackConfig::column_number`], `number` starts at 1.
    pub fn column_position(&self, number: usize) -> (usize, usize) {
        debug_assert!(
            (1..=self.rows * self.cols).contains(&number),
            "column number {} outside of the {}x{} grid",
            number,
            self.rows,
            self.cols
        );
        ((number - 1) / self.cols + 1, (number - 1) % self.cols + 1)
    }

    /// All `(row, col)` positions, row-major.
    pub fn columns(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..=self.rows * self.cols).map(move |n| self.column_position(n))
    }

    /// Load and validate the configuration from a YAML file.
    pub fn load(filename: &str) -> Result<Self, Error> {
        let config = Self::read(filename)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the YAML file without validating, for callers that override
    /// values before [`StackConfig::validate`].
    pub fn read(filename: &str) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(filename) {
            Ok(content) => content,
            Err(err) => return Err(Error::IoError(format!("{}: {}", filename, err))),
        };
        Self::parse_yaml(&content).map_err(|err| match err {
            Error::YamlError(_, reason) => Error::YamlError(filename.to_string(), reason),
            err => err,
        })
    }

    /// Parse and validate the configuration from YAML text, missing keys
    /// keep their defaults.
    pub fn from_yaml(content: &str) -> Result<Self, Error> {
        let config = Self::parse_yaml(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text without validating the values.
    pub fn parse_yaml(content: &str) -> Result<Self, Error> {
        let docs = match YamlLoader::load_from_str(content) {
            Ok(docs) => docs,
            Err(err) => return Err(Error::YamlError(String::from("<string>"), err.to_string())),
        };
        let mut config = Self::default();
        let Some(doc) = docs.first() else {
            return Ok(config);
        };
        if !matches!(doc, Yaml::Hash(_)) {
            return Err(Error::YamlError(
                String::from("<string>"),
                String::from("expected a mapping"),
            ));
        }

        if let Some(size) = yaml_usize(doc, "size")? {
            config.rows = size;
            config.cols = size;
        }
        if let Some(rows) = yaml_usize(doc, "rows")? {
            config.rows = rows;
        }
        if let Some(cols) = yaml_usize(doc, "cols")? {
            config.cols = cols;
        }
        if let Some(layers) = yaml_usize(doc, "layers")? {
            config.layers = layers;
        }
        if let Some(step) = yaml_usize(doc, "release_step_ms")? {
            config.release_step_ms = step as u64;
        }
        match &doc["supply_voltage"] {
            Yaml::BadValue => {}
            Yaml::Integer(v) => config.supply_voltage = *v as f64,
            Yaml::Real(v) => {
                config.supply_voltage = v.parse().map_err(|_| {
                    Error::YamlError(String::from("<string>"), format!("bad supply_voltage {}", v))
                })?
            }
            other => {
                return Err(Error::YamlError(
                    String::from("<string>"),
                    format!("bad supply_voltage {:?}", other),
                ))
            }
        }
        match &doc["resistor_value"] {
            Yaml::BadValue => {}
            Yaml::String(v) | Yaml::Real(v) => config.resistor_value = v.to_string(),
            Yaml::Integer(v) => config.resistor_value = v.to_string(),
            other => {
                return Err(Error::YamlError(
                    String::from("<string>"),
                    format!("bad resistor_value {:?}", other),
                ))
            }
        }

        debug!("loaded stack configuration {:?}", config);
        Ok(config)
    }
}

fn yaml_usize(doc: &Yaml, key: &str) -> Result<Option<usize>, Error> {
    match &doc[key] {
        Yaml::BadValue => Ok(None),
        Yaml::Integer(v) if *v >= 0 => Ok(Some(*v as usize)),
        Yaml::Integer(v) => Err(Error::InvalidConfiguration(format!(
            "{} must not be negative (got {})",
            key, v
        ))),
        other => Err(Error::YamlError(
            String::from("<string>"),
            format!("{} is not an integer: {:?}", key, other),
        )),
    }
}
