//!ngspice batch runner.
//!
//! Runs `ngspice -b` on a netlist inside a private scratch directory. The
//! files the netlist writes with relative names (`wrdata`, `write`) end up
//! in that directory and live as long as the runner or the directory taken
//! out of it with [`NgSpice::into_workdir`].
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, warn};
use tempfile::TempDir;
use thiserror::Error;

/// Name of the netlist file in the scratch directory.
pub const CIRCUIT_FILE: &str = "circuit.cir";

///ngspice errors.
#[derive(Error, Debug)]
pub enum NgSpiceError {
    #[error("can not start ngspice `{0}`: {1}")]
    Init(String, String),
    #[error("no circuit loaded.")]
    NoCircuit,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Spice Error: {0}\n{1}")]
    Spice(i32, String),
}

///type for the ngspice callback.
pub trait Callbacks {
    fn send_char(&mut self, _s: &str) {}
    fn controlled_exit(&mut self, _status: i32, _unload: bool, _quit: bool) {}
}

///The main struct to use ngspice.
pub struct NgSpice<'a, C> {
    ///the callback to receive messages from ngspice.
    pub callbacks: &'a mut C,
    executable: String,
    workdir: TempDir,
    circuit: Option<PathBuf>,
}

impl<'a, C: Callbacks> NgSpice<'a, C> {
    pub fn new(callbacks: &'a mut C) -> Result<Self, NgSpiceError> {
        let workdir = tempfile::Builder::new().prefix("ngspice").tempdir()?;
        debug!("ngspice scratch directory {}", workdir.path().display());
        Ok(Self {
            callbacks,
            executable: String::from("ngspice"),
            workdir,
            circuit: None,
        })
    }

    /// Use another ngspice binary than the one on the `PATH`.
    pub fn with_executable(mut self, executable: &str) -> Self {
        self.executable = executable.to_string();
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Write the netlist to the scratch directory.
    pub fn circuit(&mut self, circ: Vec<String>) -> Result<(), NgSpiceError> {
        let path = self.workdir.path().join(CIRCUIT_FILE);
        let mut out = BufWriter::new(File::create(&path)?);
        for line in circ {
            writeln!(out, "{}", line)?;
        }
        out.flush()?;
        self.circuit = Some(path);
        Ok(())
    }

    /// Run the loaded circuit and wait for ngspice to exit.
    ///
    /// Every line ngspice prints is passed to [`Callbacks::send_char`], the
    /// exit status to [`Callbacks::controlled_exit`].
    pub fn run(&mut self) -> Result<(), NgSpiceError> {
        let Some(circuit) = &self.circuit else {
            return Err(NgSpiceError::NoCircuit);
        };
        debug!("run {} -b {}", self.executable, circuit.display());
        let output = Command::new(&self.executable)
            .arg("-b")
            .arg(CIRCUIT_FILE)
            .current_dir(self.workdir.path())
            .output()
            .map_err(|err| NgSpiceError::Init(self.executable.clone(), err.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            self.callbacks.send_char(&format!("stdout {}", line));
        }
        for line in stderr.lines() {
            self.callbacks.send_char(&format!("stderr {}", line));
        }

        // killed by a signal when there is no code
        let status = output.status.code().unwrap_or(-1);
        self.callbacks.controlled_exit(status, false, true);
        if !output.status.success() {
            warn!("ngspice exited with status {}", status);
            return Err(NgSpiceError::Spice(
                status,
                format!("{}{}", stdout, stderr),
            ));
        }
        Ok(())
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Path of a file ngspice writes with a relative name.
    pub fn output(&self, name: &str) -> PathBuf {
        self.workdir.path().join(name)
    }

    /// Take the scratch directory, it is removed when dropped.
    pub fn into_workdir(self) -> TempDir {
        self.workdir
    }
}
