#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("{0}")]
    Simulation(String),
    #[error("File manipulation error {0}.")]
    IoError(String),
    #[error("Can not write JSON: {0}")]
    Json(String),
}

impl std::convert::From<simulation::Error> for Error {
    fn from(err: simulation::Error) -> Self {
        Error::Simulation(err.to_string())
    }
}
impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}
impl std::convert::From<json::Error> for Error {
    fn from(err: json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
