//! Decode the measurement table written by `wrdata`.
//!
//! Every line of the table is one time step. For every exported vector the
//! line carries a `time value` pair, so a table with `n` probes has `2n`
//! columns and the time is repeated for every probe:
//!
//! ```text
//!  0.000000e+00  4.999e+00  0.000000e+00  4.999e+00 ...
//! ```
//!
//! The probes are grouped by four into columns, in the order the netlist
//! exports them. The voltage of a column is the mean of its probes.
use std::path::Path;

use log::{debug, info};
use ndarray::{s, Array2, Axis};

use crate::{
    config::{StackConfig, BRACKETS_PER_SATELLITE},
    error::Error,
};

/// The raw probe values.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementTable {
    /// Time of every step in seconds.
    pub time: Vec<f64>,
    /// Probe values, one row per time step and one column per probe.
    pub values: Array2<f64>,
}

/// One averaged sample of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageSample {
    pub time_ms: f64,
    pub voltage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeasurements {
    pub column_id: String,
    pub column_label: String,
    pub row: usize,
    pub col: usize,
    pub data: Vec<VoltageSample>,
}

fn parse_error(line: usize, content: &str, reason: String) -> Error {
    Error::MeasurementParseError {
        line,
        content: content.to_string(),
        reason,
    }
}

impl MeasurementTable {
    /// Parse the ascii table.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let mut time = Vec::new();
        let mut values = Vec::new();
        let mut probes: Option<usize> = None;

        for (index, line) in content.lines().enumerate() {
            let number = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let tokens = line
                .split_whitespace()
                .map(|token| match token.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    Ok(_) => Err(parse_error(
                        number,
                        line,
                        format!("`{}` is not a finite number", token),
                    )),
                    Err(_) => Err(parse_error(
                        number,
                        line,
                        format!("`{}` is not a number", token),
                    )),
                })
                .collect::<Result<Vec<f64>, Error>>()?;
            if tokens.len() % 2 != 0 {
                return Err(parse_error(
                    number,
                    line,
                    format!("odd number of values ({})", tokens.len()),
                ));
            }
            let count = tokens.len() / 2;
            match probes {
                None => probes = Some(count),
                Some(expected) if expected != count => {
                    return Err(parse_error(
                        number,
                        line,
                        format!("{} probes, previous lines have {}", count, expected),
                    ));
                }
                Some(_) => {}
            }
            time.push(tokens[0]);
            values.extend(tokens.chunks(2).map(|pair| pair[1]));
        }

        let probes = probes.unwrap_or(0);
        let values = Array2::from_shape_vec((time.len(), probes), values)
            .map_err(|err| Error::IoError(err.to_string()))?;
        debug!("measurement table: {} steps, {} probes", time.len(), probes);
        Ok(Self { time, values })
    }

    pub fn probes(&self) -> usize {
        self.values.ncols()
    }

    pub fn steps(&self) -> usize {
        self.time.len()
    }

    /// Average the probes of every column.
    pub fn columns(&self, config: &StackConfig) -> Result<Vec<ColumnMeasurements>, Error> {
        let expected = config.derived().columns * BRACKETS_PER_SATELLITE;
        if self.probes() != expected {
            return Err(Error::ConfigMismatch {
                expected,
                actual: self.probes(),
            });
        }

        let mut result = Vec::new();
        for (row, col) in config.columns() {
            let number = config.column_number(row, col);
            let start = (number - 1) * BRACKETS_PER_SATELLITE;
            let probes = self.values.slice(s![.., start..start + BRACKETS_PER_SATELLITE]);
            let data = match probes.mean_axis(Axis(1)) {
                Some(mean) => self
                    .time
                    .iter()
                    .zip(mean.iter())
                    .map(|(time, voltage)| VoltageSample {
                        time_ms: time * 1000.0,
                        voltage: *voltage,
                    })
                    .collect(),
                None => Vec::new(),
            };
            result.push(ColumnMeasurements {
                column_id: format!("col-{}", number),
                column_label: format!("{}-{}", row, col),
                row,
                col,
                data,
            });
        }
        Ok(result)
    }
}

/// Decode the table text into the column measurements.
pub fn decode(content: &str, config: &StackConfig) -> Result<Vec<ColumnMeasurements>, Error> {
    MeasurementTable::parse(content)?.columns(config)
}

/// Decode the table file into the column measurements.
pub fn decode_file<P: AsRef<Path>>(
    path: P,
    config: &StackConfig,
) -> Result<Vec<ColumnMeasurements>, Error> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            return Err(Error::MeasurementFileNotFound(
                path.display().to_string(),
                err.to_string(),
            ))
        }
    };
    let columns = decode(&content, config)?;
    info!("decoded {} columns from {}", columns.len(), path.display());
    Ok(columns)
}
