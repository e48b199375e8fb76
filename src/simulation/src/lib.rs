//! Netlist generation and measurement decoding for satellite stacks.
//!
//! A [`StackConfig`] describes the stack. [`netlist::build`] turns it into
//! an ngspice netlist that releases one bracket after the other, and
//! [`measurement::decode`] turns the table the simulator writes back into
//! the averaged voltage of every column.
mod error;
pub mod circuit;
pub mod config;
pub mod measurement;
pub mod netlist;
pub mod schedule;
mod simulation;
pub mod units;

pub use {
    error::Error,
    circuit::Circuit,
    config::{StackConfig, StackDerived},
    measurement::{ColumnMeasurements, MeasurementTable, VoltageSample},
    netlist::NetlistBuilder,
    schedule::{Release, SatelliteRelease},
    self::simulation::{
        Cb, NgSpiceSimulator, Simulation, SimulationResults, Simulator, SimulatorOutput,
    },
};
