use derive_more::Display;
use types::errors::LiquidityError;

#[derive(Debug, Display)]
pub enum CliError {
    #[display("{_0}")]
    Liquidity(LiquidityError),

    #[display("Io error: {_0}")]
    Io(std::io::Error),

    #[display("Invalid argument: {_0}")]
    InvalidArgument(String),

    #[display("Failed to start metrics exporter: {_0}")]
    Metrics(String),

    #[display("Failed to encode output: {_0}")]
    Output(serde_json::Error),
}

impl std::error::Error for CliError {}

impl From<LiquidityError> for CliError {
    fn from(error: LiquidityError) -> Self {
        Self::Liquidity(error)
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Output(error)
    }
}
