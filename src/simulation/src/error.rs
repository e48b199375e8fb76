#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid stack configuration: {0}.")]
    InvalidConfiguration(String),
    #[error("Simulator failed: \"{0}\"")]
    SimulatorFailure(String),
    #[error("Measurement file not found {0} ({1}).")]
    MeasurementFileNotFound(String, String),
    #[error("Can not parse measurement line {line}: {reason} (`{content}`)")]
    MeasurementParseError {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("Measurement table has {actual} probes, configuration expects {expected}.")]
    ConfigMismatch { expected: usize, actual: usize },
    #[error("File manipulation error {0}.")]
    IoError(String),
    #[error("Can not parse YAML file: {0} ({1}).")]
    YamlError(String, String),
}
impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
impl std::convert::From<ngspice::NgSpiceError> for Error {
    fn from(err: ngspice::NgSpiceError) -> Self {
        Error::SimulatorFailure(err.to_string())
    }
}
