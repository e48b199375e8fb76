use std::fs::File;
use std::io::Write;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table,
};
use log::info;

mod error;

use crate::error::Error;
use simulation::{
    measurement, schedule, units, ColumnMeasurements, NgSpiceSimulator, SatelliteRelease,
    Simulation, SimulationResults, StackConfig,
};

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn write_summary(config: &StackConfig) {
    let derived = config.derived();
    println!("{}", "Stack".bold());
    println!(
        "  {} x {} columns, {} layers, {} satellites, {} brackets",
        config.rows, config.cols, config.layers, derived.satellites, derived.brackets
    );
    println!(
        "  supply {} V, resistor {}, release every {}",
        config.supply_voltage,
        config
            .resistance()
            .map(units::format_ohms)
            .unwrap_or_else(|| config.resistor_value.clone()),
        units::format_ms(config.release_step_ms as f64)
    );
    println!(
        "  {} releases, simulation ends after {}",
        derived.releases,
        units::format_ms(derived.sim_end_ms as f64)
    );
}

fn write_measurements(measurements: &[ColumnMeasurements]) {
    let mut table = table(vec!["Column", "Position", "Samples", "Min", "Max", "Final"]);
    for column in measurements {
        let min = column.data.iter().map(|s| s.voltage).fold(f64::INFINITY, f64::min);
        let max = column
            .data
            .iter()
            .map(|s| s.voltage)
            .fold(f64::NEG_INFINITY, f64::max);
        let last = column.data.last().map(|s| s.voltage).unwrap_or(f64::NAN);
        table.add_row(vec![
            Cell::new(&column.column_id),
            Cell::new(&column.column_label),
            Cell::new(column.data.len()),
            Cell::new(format!("{:.3} V", min)),
            Cell::new(format!("{:.3} V", max)),
            Cell::new(format!("{:.3} V", last)),
        ]);
    }
    println!("{table}");
}

fn satellites_json(satellites: &[SatelliteRelease]) -> Result<json::JsonValue, Error> {
    let mut data = json::JsonValue::new_array();
    for sat in satellites {
        data.push(json::object! {
            id: sat.id.clone(),
            column: sat.column,
            row: sat.row,
            layer: sat.layer,
            releaseTimeMs: sat.release_time_ms,
        })?;
    }
    Ok(data)
}

fn measurements_json(measurements: &[ColumnMeasurements]) -> Result<json::JsonValue, Error> {
    let mut data = json::JsonValue::new_array();
    for column in measurements {
        let mut samples = json::JsonValue::new_array();
        for sample in &column.data {
            samples.push(json::object! {
                timeMs: sample.time_ms,
                voltage: sample.voltage,
            })?;
        }
        data.push(json::object! {
            columnId: column.column_id.clone(),
            columnLabel: column.column_label.clone(),
            data: samples,
        })?;
    }
    Ok(data)
}

fn config_json(config: &StackConfig) -> json::JsonValue {
    json::object! {
        rows: config.rows,
        cols: config.cols,
        layers: config.layers,
        releaseStepMs: config.release_step_ms,
        supplyVoltage: config.supply_voltage,
        resistorValue: config.resistor_value.clone(),
    }
}

fn results_json(results: &SimulationResults) -> Result<json::JsonValue, Error> {
    let mut data = json::object! {
        config: config_json(&results.config),
        satellites: satellites_json(&results.satellites)?,
        measurements: measurements_json(&results.measurements)?,
    };
    if let Some(raw) = &results.raw_output {
        data["rawOutput"] = raw.clone().into();
    }
    Ok(data)
}

fn write_json(data: &json::JsonValue, output: &str) -> Result<(), Error> {
    let mut out = File::create(output)?;
    data.write_pretty(&mut out, 2)?;
    out.flush()?;
    info!("wrote {}", output);
    Ok(())
}

#[derive(Args)]
struct StackArgs {
    #[clap(short, long, value_parser)]
    /// YAML file with the stack configuration.
    config: Option<String>,
    #[clap(long)]
    rows: Option<usize>,
    #[clap(long)]
    cols: Option<usize>,
    #[clap(long)]
    /// Square grid, sets rows and cols.
    size: Option<usize>,
    #[clap(long)]
    /// Satellites per column.
    layers: Option<usize>,
    #[clap(long)]
    /// Time between two releases in ms.
    step: Option<u64>,
    #[clap(long)]
    /// Supply voltage of every column.
    voltage: Option<f64>,
    #[clap(long)]
    /// Bracket and reference resistor, e.g. 10k.
    resistor: Option<String>,
}

impl StackArgs {
    fn config(&self) -> Result<StackConfig, Error> {
        let mut config = if let Some(filename) = &self.config {
            StackConfig::read(filename)?
        } else {
            StackConfig::default()
        };
        if let Some(size) = self.size {
            config.rows = size;
            config.cols = size;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if let Some(layers) = self.layers {
            config.layers = layers;
        }
        if let Some(step) = self.step {
            config.release_step_ms = step;
        }
        if let Some(voltage) = self.voltage {
            config.supply_voltage = voltage;
        }
        if let Some(resistor) = &self.resistor {
            config.resistor_value = resistor.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the ngspice netlist of the stack.
    Netlist {
        #[clap(flatten)]
        stack: StackArgs,
        #[clap(short, long, value_parser)]
        /// Output Filename (default: stdout).
        output: Option<String>,
    },
    /// List the release events.
    Schedule {
        #[clap(flatten)]
        stack: StackArgs,
        #[clap(long)]
        /// List the satellites instead of the release order.
        satellites: bool,
    },
    /// Decode a measurement table written by ngspice.
    Decode {
        #[clap(flatten)]
        stack: StackArgs,
        #[clap(short, long, value_parser)]
        input: String,
        #[clap(short, long, value_parser)]
        /// the JSON output filename, prints a summary when not defined.
        output: Option<String>,
    },
    /// Generate the netlist, run ngspice and decode the measurements.
    Simulate {
        #[clap(flatten)]
        stack: StackArgs,
        #[clap(long, value_parser, default_value = "ngspice")]
        /// The ngspice executable.
        ngspice: String,
        #[clap(short, long, value_parser)]
        /// the JSON output filename, prints a summary when not defined.
        output: Option<String>,
    },
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Cli::parse();
    match args.command {
        Command::Netlist { stack, output } => {
            let simulation = Simulation::new(stack.config()?)?;
            simulation.circuit.save(output)?;
        }
        Command::Schedule { stack, satellites } => {
            let config = stack.config()?;
            write_summary(&config);
            if satellites {
                let mut table = table(vec!["Id", "Layer", "Row", "Column", "Release"]);
                for sat in schedule::satellite_listing(&config) {
                    table.add_row(vec![
                        Cell::new(sat.id),
                        Cell::new(sat.layer),
                        Cell::new(sat.row),
                        Cell::new(sat.column),
                        Cell::new(format!("{} ms", sat.release_time_ms)),
                    ]);
                }
                println!("{table}");
            } else {
                let mut table = table(vec!["#", "Layer", "Row", "Column", "Release", "Control"]);
                for release in schedule::schedule(&config) {
                    table.add_row(vec![
                        Cell::new(release.index),
                        Cell::new(release.layer),
                        Cell::new(release.row),
                        Cell::new(release.col),
                        Cell::new(format!("{} ms", release.time_ms)),
                        Cell::new(release.control_node()),
                    ]);
                }
                println!("{table}");
            }
        }
        Command::Decode {
            stack,
            input,
            output,
        } => {
            let config = stack.config()?;
            let measurements = measurement::decode_file(&input, &config)?;
            if let Some(output) = output {
                write_json(&measurements_json(&measurements)?, &output)?;
            } else {
                write_measurements(&measurements);
            }
        }
        Command::Simulate {
            stack,
            ngspice,
            output,
        } => {
            let simulation = Simulation::new(stack.config()?)?;
            let mut simulator = NgSpiceSimulator::new(&ngspice);
            let results = match simulation.run(&mut simulator) {
                Ok(results) => results,
                Err(err) => {
                    eprintln!("{} {}", "simulation failed:".red().bold(), err);
                    return Err(err.into());
                }
            };
            if let Some(output) = output {
                write_json(&results_json(&results)?, &output)?;
            } else {
                write_summary(&results.config);
                write_measurements(&results.measurements);
            }
        }
    }
    Ok(())
}
