use crate::error::Error;

use indexmap::IndexMap;
use std::{
    fs::File,
    io::Write,
};

/// Independent source waveform.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Dc(f64),
    /// Piecewise linear points, time in milliseconds and volts.
    Pwl(Vec<(u64, f64)>),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Source::Dc(value) => write!(f, "{}", value),
            Source::Pwl(points) => {
                let points: Vec<String> = points
                    .iter()
                    .map(|(time, volts)| {
                        if *time == 0 {
                            format!("0 {}", volts)
                        } else {
                            format!("{}m {}", time, volts)
                        }
                    })
                    .collect();
                write!(f, "PWL({})", points.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CircuitItem {
    /// Resistor: reference, n0, n1, value.
    R(String, String, String, String),
    /// Voltage controlled switch: reference, n0, n1, control+, control-, model.
    S(String, String, String, String, String, String),
    /// Voltage source: reference, n+, n-, waveform.
    V(String, String, String, Source),
    /// Subcircuit instance: reference, nodes, subcircuit, parameters.
    X(String, Vec<String>, String, Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub kind: String,
    pub parameters: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subcircuit {
    pub ports: Vec<String>,
    pub parameters: Vec<(String, String)>,
    pub circuit: Circuit,
}

/// Analysis directives.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Tran { step: String, stop: String },
}

/// Commands of the `.control` block.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Set(String, String),
    Run,
    /// Write the vectors to an ascii table.
    WrData(String, Vec<String>),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    name: String,
    items: Vec<CircuitItem>,
    models: IndexMap<String, Model>,
    subcircuits: IndexMap<String, Subcircuit>,
    directives: Vec<Directive>,
    controls: Vec<Control>,
}

///The Circuit struct represents a ngspice netlist.
impl Circuit {
    pub fn new(name: String) -> Self {
        Self {
            name,
            items: Vec::new(),
            models: IndexMap::new(),
            subcircuits: IndexMap::new(),
            directives: Vec::new(),
            controls: Vec::new(),
        }
    }

    //Add a resistor to the netlist.
    pub fn resistor(&mut self, reference: String, n0: String, n1: String, value: String) {
        self.items.push(CircuitItem::R(reference, n0, n1, value));
    }

    //Add a voltage controlled switch to the netlist.
    pub fn switch(
        &mut self,
        reference: String,
        n0: String,
        n1: String,
        control: (String, String),
        model: String,
    ) {
        self.items
            .push(CircuitItem::S(reference, n0, n1, control.0, control.1, model));
    }

    pub fn voltage(&mut self, reference: String, n1: String, n2: String, source: Source) {
        self.items.push(CircuitItem::V(reference, n1, n2, source));
    }

    //Instantiate a subcircuit.
    pub fn circuit(
        &mut self,
        reference: String,
        n: Vec<String>,
        value: String,
        parameters: Vec<(String, String)>,
    ) {
        self.items.push(CircuitItem::X(reference, n, value, parameters));
    }

    pub fn subcircuit(
        &mut self,
        name: String,
        ports: Vec<String>,
        parameters: Vec<(String, String)>,
        circuit: Circuit,
    ) {
        self.subcircuits.insert(
            name,
            Subcircuit {
                ports,
                parameters,
                circuit,
            },
        );
    }

    pub fn model(&mut self, name: String, kind: String, parameters: Vec<(String, String)>) {
        self.models.insert(name, Model { kind, parameters });
    }

    pub fn directive(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn control(&mut self, control: Control) {
        self.controls.push(control);
    }

    pub fn items(&self) -> &[CircuitItem] {
        &self.items
    }

    pub fn models(&self) -> &IndexMap<String, Model> {
        &self.models
    }

    pub fn get_subcircuit(&self, name: &str) -> Option<&Subcircuit> {
        self.subcircuits.get(name)
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// The rendered netlist text.
    pub fn netlist(&self) -> String {
        let mut text = self.to_str(true).join("\n");
        text.push('\n');
        text
    }

    pub fn save(&self, filename: Option<String>) -> Result<(), Error> {
        let mut out: Box<dyn Write> = if let Some(filename) = filename {
            Box::new(File::create(filename)?)
        } else {
            Box::new(std::io::stdout())
        };

        for s in self.to_str(true) {
            writeln!(out, "{}", s)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn prefixed(prefix: char, reference: &str) -> String {
    if reference.starts_with(prefix) {
        reference.to_string()
    } else {
        format!("{}{}", prefix, reference)
    }
}

fn parameters(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!(" {}={}", key, value))
        .collect()
}

impl Circuit {
    /// Render the statements.
    ///
    /// The top level circuit starts with the title and, when `close` is set,
    /// carries the control block and the final `.end`. Subcircuit bodies are
    /// rendered with `close` unset.
    pub fn to_str(&self, close: bool) -> Vec<String> {
        let mut res = Vec::new();

        if close {
            res.push(format!(".title {}", self.name));
        }

        for (key, model) in &self.models {
            let params: Vec<String> = model
                .parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            res.push(format!(".model {} {}({})", key, model.kind, params.join(" ")));
        }

        for (key, value) in &self.subcircuits {
            let nodes = value.ports.join(" ");
            res.push(format!(
                ".subckt {} {}{}",
                key,
                nodes,
                parameters(&value.parameters)
            ));
            res.append(&mut value.circuit.to_str(false));
            res.push(format!(".ends {}", key));
        }

        for item in &self.items {
            match item {
                CircuitItem::R(reference, n0, n1, value) => {
                    res.push(format!("{} {} {} {}", prefixed('R', reference), n0, n1, value));
                }
                CircuitItem::S(reference, n0, n1, c0, c1, model) => {
                    res.push(format!(
                        "{} {} {} {} {} {}",
                        prefixed('S', reference),
                        n0,
                        n1,
                        c0,
                        c1,
                        model
                    ));
                }
                CircuitItem::V(reference, n0, n1, source) => {
                    res.push(format!("{} {} {} {}", prefixed('V', reference), n0, n1, source));
                }
                CircuitItem::X(reference, n, value, params) => {
                    res.push(format!(
                        "{} {} {}{}",
                        prefixed('X', reference),
                        n.join(" "),
                        value,
                        parameters(params)
                    ));
                }
            }
        }

        for directive in &self.directives {
            match directive {
                Directive::Tran { step, stop } => res.push(format!(".tran {} {}", step, stop)),
            }
        }

        if !self.controls.is_empty() {
            res.push(String::from(".control"));
            for control in &self.controls {
                res.push(match control {
                    Control::Set(key, value) => format!("set {}={}", key, value),
                    Control::Run => String::from("run"),
                    Control::WrData(file, vectors) => {
                        format!("wrdata {} {}", file, vectors.join(" "))
                    }
                    Control::Quit => String::from("quit"),
                });
            }
            res.push(String::from(".endc"));
        }

        if close {
            res.push(String::from(".end"));
        }
        res
    }
}
