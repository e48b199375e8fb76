//! Run the stack simulation
//!
//! The simulator itself is hidden behind the [`Simulator`] trait. The
//! [`Simulation`] creates the netlist, hands it to a simulator and decodes
//! the measurement table the simulator leaves behind.
use std::path::PathBuf;

use log::{debug, info, log_enabled, Level};
use ngspice::{Callbacks, NgSpice};
use tempfile::TempDir;

use crate::{
    circuit::Circuit,
    config::StackConfig,
    error::Error,
    measurement::{self, ColumnMeasurements},
    netlist::{NetlistBuilder, MEASUREMENT_FILE},
    schedule::{self, SatelliteRelease},
};

/// The callback message buffer
pub struct Cb {
    ///The string buffer
    strs: Vec<String>,
    ///last status
    status: i32,
}

impl Cb {
    /// Creates a new Callback struct.
    pub fn new() -> Self {
        Self {
            strs: Vec::new(),
            status: 0,
        }
    }
}

impl Default for Cb {
    fn default() -> Self {
        Self::new()
    }
}

impl Callbacks for Cb {
    fn send_char(&mut self, s: &str) {
        debug!("{}", s);
        self.strs.push(s.to_string())
    }
    fn controlled_exit(&mut self, status: i32, _unload: bool, _quit: bool) {
        self.status = status;
    }
}

/// What a simulator run leaves behind.
#[derive(Debug)]
pub struct SimulatorOutput {
    /// Console output of the simulator.
    pub log: Vec<String>,
    /// The measurement table.
    pub output: PathBuf,
    workdir: Option<TempDir>,
}

impl SimulatorOutput {
    pub fn new(log: Vec<String>, output: PathBuf) -> Self {
        Self {
            log,
            output,
            workdir: None,
        }
    }

    /// Keep `workdir` alive as long as the output.
    pub fn with_workdir(mut self, workdir: TempDir) -> Self {
        self.workdir = Some(workdir);
        self
    }
}

/// The external circuit simulator.
///
/// `run` returns when the simulator finished, the measurement table is
/// complete at this point.
pub trait Simulator {
    fn run(&mut self, netlist: &str) -> Result<SimulatorOutput, Error>;
}

/// Runs ngspice in batch mode.
#[derive(Debug, Clone)]
pub struct NgSpiceSimulator {
    pub executable: String,
}

impl NgSpiceSimulator {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
        }
    }
}

impl Default for NgSpiceSimulator {
    fn default() -> Self {
        Self::new("ngspice")
    }
}

impl Simulator for NgSpiceSimulator {
    fn run(&mut self, netlist: &str) -> Result<SimulatorOutput, Error> {
        let mut cb = Cb::new();
        let mut ng = NgSpice::new(&mut cb)?.with_executable(&self.executable);
        ng.circuit(netlist.lines().map(|line| line.to_string()).collect())?;
        ng.run()?;
        let output = ng.output(MEASUREMENT_FILE);
        let workdir = ng.into_workdir();
        debug!("ngspice finished with status {}", cb.status);
        Ok(SimulatorOutput::new(cb.strs, output).with_workdir(workdir))
    }
}

/// Everything a simulation run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResults {
    pub config: StackConfig,
    pub satellites: Vec<SatelliteRelease>,
    pub measurements: Vec<ColumnMeasurements>,
    pub raw_output: Option<String>,
}

///# The Simulation struct
///
/// ## Examples
///
/// Create the netlist without running it:
///
/// ```
/// use simulation::{Simulation, StackConfig};
///
/// let simulation = Simulation::new(StackConfig::new(2, 2, 1, 10, 5.0, "10k")).unwrap();
/// assert!(simulation.netlist().contains("wrdata mes_voltages.dat V(MES_1_1_1)"));
/// ```
pub struct Simulation {
    pub config: StackConfig,
    pub circuit: Circuit,
}

impl Simulation {
    ///### Create new simulation from the stack configuration.
    pub fn new(config: StackConfig) -> Result<Self, Error> {
        let circuit = NetlistBuilder::new(&config)?.circuit();
        Ok(Self { config, circuit })
    }

    pub fn netlist(&self) -> String {
        self.circuit.netlist()
    }

    ///Run the netlist with the simulator and decode the measurements.
    pub fn run<S: Simulator>(&self, simulator: &mut S) -> Result<SimulationResults, Error> {
        let netlist = self.netlist();
        if log_enabled!(Level::Debug) {
            debug!("run netlist:\n{}", netlist);
        }
        info!(
            "simulate {}x{} stack with {} layers",
            self.config.rows, self.config.cols, self.config.layers
        );
        let output = simulator.run(&netlist)?;
        let measurements = measurement::decode_file(&output.output, &self.config)?;
        Ok(SimulationResults {
            config: self.config.clone(),
            satellites: schedule::satellite_listing(&self.config),
            measurements,
            raw_output: Some(output.log.join("\n")),
        })
    }
}
