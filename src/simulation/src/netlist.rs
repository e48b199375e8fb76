//! Build the ngspice netlist for a satellite stack.
//!
//! The netlist is a hierarchy of three subcircuits:
//!
//! * `BRACKET`: a switch between `sigin` and `sigout` with a resistor
//!   from `sigout` to the ground rail. The switch is closed until its
//!   control input rises above 2V.
//! * `SATELLITE`: four brackets that share one control input.
//! * `COLUMN`: four reference resistors from the supply to the measurement
//!   nodes, followed by one satellite per layer. The outputs of the last
//!   satellite end in a high ohmic sink.
//!
//! Every column gets its own supply, every bracket layer its own control
//! source. The measurement nodes are exported row by row, column by column,
//! probes 1 to 4; the decoder reads the table in exactly this order.
//!
//! # Example:
//!
//! ```
//! use simulation::{StackConfig, netlist};
//!
//! let config = StackConfig::new(1, 1, 1, 10, 5.0, "10k");
//! let text = netlist::build(&config).unwrap();
//! assert!(text.contains("VCTRL_L1_R1_C1 CTRL_L1_R1_C1 0 PWL(0 0 9m 0 10m 5)"));
//! ```
use log::{debug, log_enabled, Level};

use crate::{
    circuit::{Circuit, Control, Directive, Source},
    config::{StackConfig, BRACKETS_PER_SATELLITE},
    error::Error,
    schedule::{self, Release},
};

/// Switch model name.
pub const SWITCH_MODEL: &str = "SW";
/// Control voltage where the brackets open.
pub const RELEASE_THRESHOLD: f64 = 2.0;
/// Control voltage after the release.
pub const RELEASE_VOLTAGE: f64 = 5.0;
/// Resistance of the sink behind the last satellite.
pub const SINK_RESISTANCE: &str = "1e12";
/// Maximum time step of the transient analysis.
pub const TRAN_STEP: &str = "0.1m";
/// File the measurement table is written to.
pub const MEASUREMENT_FILE: &str = "mes_voltages.dat";

const RVAL: &str = "RVAL";

pub fn column_node(row: usize, col: usize) -> String {
    format!("C_{}_{}", row, col)
}

/// Name of measurement node `probe` (1 to 4) of the column.
pub fn probe_node(row: usize, col: usize, probe: usize) -> String {
    format!("MES_{}_{}_{}", row, col, probe)
}

/// Zero based position of the probe in the exported table.
pub fn probe_index(config: &StackConfig, row: usize, col: usize, probe: usize) -> usize {
    (config.column_number(row, col) - 1) * BRACKETS_PER_SATELLITE + (probe - 1)
}

/// The exported vectors in table order.
pub fn probe_vectors(config: &StackConfig) -> Vec<String> {
    config
        .columns()
        .flat_map(|(row, col)| {
            (1..=BRACKETS_PER_SATELLITE).map(move |probe| format!("V({})", probe_node(row, col, probe)))
        })
        .collect()
}

/// The control waveform of one release event.
///
/// The signal holds 0V until one millisecond before the release and then
/// ramps to the release voltage.
pub fn control_source(release: &Release) -> Source {
    let mut points = Vec::new();
    if release.time_ms > 1 {
        points.push((0, 0.0));
    }
    points.push((release.time_ms - 1, 0.0));
    points.push((release.time_ms, RELEASE_VOLTAGE));
    Source::Pwl(points)
}

fn four<F: Fn(usize) -> String>(f: F) -> Vec<String> {
    (1..=BRACKETS_PER_SATELLITE).map(f).collect()
}

fn rval(value: &str) -> Vec<(String, String)> {
    vec![(RVAL.to_string(), value.to_string())]
}

/// Creates the netlist of a stack configuration.
pub struct NetlistBuilder<'a> {
    config: &'a StackConfig,
}

impl<'a> NetlistBuilder<'a> {
    pub fn new(config: &'a StackConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    fn bracket(&self) -> Circuit {
        let mut bracket = Circuit::new(String::from("BRACKET"));
        bracket.switch(
            String::from("br"),
            String::from("sigin"),
            String::from("sigout"),
            (String::from("ctrl"), String::from("gnd")),
            SWITCH_MODEL.to_string(),
        );
        bracket.resistor(
            String::from("br"),
            String::from("sigout"),
            String::from("gnd"),
            format!("{{{}}}", RVAL),
        );
        bracket
    }

    fn satellite(&self) -> Circuit {
        let mut satellite = Circuit::new(String::from("SATELLITE"));
        for i in 1..=BRACKETS_PER_SATELLITE {
            satellite.circuit(
                format!("b{}", i),
                vec![
                    format!("sigin{}", i),
                    format!("sigout{}", i),
                    format!("gnd{}", i),
                    String::from("ctrl"),
                ],
                String::from("BRACKET"),
                rval(&format!("{{{}}}", RVAL)),
            );
        }
        satellite
    }

    fn column(&self) -> Circuit {
        let layers = self.config.layers;
        let mut column = Circuit::new(String::from("COLUMN"));
        for i in 1..=BRACKETS_PER_SATELLITE {
            column.resistor(
                format!("ref{}", i),
                String::from("vin"),
                format!("mes{}", i),
                format!("{{{}}}", RVAL),
            );
        }
        column.resistor(
            String::from("end"),
            String::from("end"),
            String::from("0"),
            SINK_RESISTANCE.to_string(),
        );
        for layer in 1..=layers {
            let inputs = if layer == 1 {
                four(|i| format!("mes{}", i))
            } else {
                four(|i| format!("sigin{}_{}", layer, i))
            };
            let outputs = if layer == layers {
                four(|_| String::from("end"))
            } else {
                four(|i| format!("sigin{}_{}", layer + 1, i))
            };
            let mut nodes = inputs;
            nodes.extend(outputs);
            nodes.extend(four(|i| format!("gnd{}", i)));
            nodes.push(format!("ctrl{}", layer));
            column.circuit(
                format!("sat{}", layer),
                nodes,
                String::from("SATELLITE"),
                rval(&format!("{{{}}}", RVAL)),
            );
        }
        column
    }

    fn column_ports(&self) -> Vec<String> {
        let mut ports = vec![String::from("vin")];
        ports.extend(four(|i| format!("gnd{}", i)));
        ports.extend((1..=self.config.layers).map(|layer| format!("ctrl{}", layer)));
        ports.extend(four(|i| format!("mes{}", i)));
        ports
    }

    /// The typed statements of the netlist.
    pub fn circuit(&self) -> Circuit {
        let config = self.config;
        let resistor = &config.resistor_value;
        let mut circuit = Circuit::new(String::from("Umbilical separation model"));

        // closed below the threshold, open above
        circuit.model(
            SWITCH_MODEL.to_string(),
            String::from("SW"),
            vec![
                (String::from("Ron"), String::from("1e12")),
                (String::from("Roff"), String::from("0.01")),
                (String::from("Vt"), RELEASE_THRESHOLD.to_string()),
                (String::from("Vh"), String::from("0")),
            ],
        );

        circuit.subcircuit(
            String::from("BRACKET"),
            vec![
                String::from("sigin"),
                String::from("sigout"),
                String::from("gnd"),
                String::from("ctrl"),
            ],
            rval(resistor),
            self.bracket(),
        );
        let mut satellite_ports = four(|i| format!("sigin{}", i));
        satellite_ports.extend(four(|i| format!("sigout{}", i)));
        satellite_ports.extend(four(|i| format!("gnd{}", i)));
        satellite_ports.push(String::from("ctrl"));
        circuit.subcircuit(
            String::from("SATELLITE"),
            satellite_ports,
            rval(resistor),
            self.satellite(),
        );
        circuit.subcircuit(
            String::from("COLUMN"),
            self.column_ports(),
            rval(resistor),
            self.column(),
        );

        for (row, col) in config.columns() {
            circuit.voltage(
                format!("_SUP_{}_{}", row, col),
                column_node(row, col),
                String::from("0"),
                Source::Dc(config.supply_voltage),
            );
        }
        for (row, col) in config.columns() {
            let mut nodes = vec![column_node(row, col)];
            nodes.extend(four(|_| String::from("0")));
            nodes.extend((1..=config.layers).map(|layer| schedule::control_node(layer, row, col)));
            nodes.extend(four(|probe| probe_node(row, col, probe)));
            circuit.circuit(
                format!("col_{}_{}", row, col),
                nodes,
                String::from("COLUMN"),
                rval(resistor),
            );
        }

        for release in schedule::schedule(config) {
            let node = release.control_node();
            circuit.voltage(node.clone(), node, String::from("0"), control_source(&release));
        }

        circuit.directive(Directive::Tran {
            step: TRAN_STEP.to_string(),
            stop: format!("{}m", config.derived().sim_end_ms),
        });
        circuit.control(Control::Set(String::from("filetype"), String::from("ascii")));
        circuit.control(Control::Run);
        circuit.control(Control::WrData(
            MEASUREMENT_FILE.to_string(),
            probe_vectors(config),
        ));
        circuit.control(Control::Quit);

        if log_enabled!(Level::Debug) {
            debug!(
                "netlist for {}x{}x{} stack: {} statements",
                config.rows,
                config.cols,
                config.layers,
                circuit.items().len()
            );
        }
        circuit
    }

    pub fn build(&self) -> String {
        self.circuit().netlist()
    }
}

/// Render the netlist of the configuration.
pub fn build(config: &StackConfig) -> Result<String, Error> {
    Ok(NetlistBuilder::new(config)?.build())
}
