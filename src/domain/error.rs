//! Domain error types.

/// Top-level error type for ticktrader.
#[derive(Debug, thiserror::Error)]
pub enum TicktraderError {
    #[error("no {input} input parameter provided to {study}")]
    MissingInput { study: String, input: String },

    #[error("invalid {input} input for {study}: {reason}")]
    InvalidInput {
        study: String,
        input: String,
        reason: String,
    },

    #[error("missing phenotype parameter {name}")]
    MissingParameter { name: String },

    #[error("phenotype parameter {name} = {value} outside [{min}, {max}]")]
    ParameterOutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown strategy {name}")]
    UnknownStrategy { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("tick data error: {reason}")]
    TickData { reason: String },

    #[error("no tick data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TicktraderError> for std::process::ExitCode {
    fn from(err: &TicktraderError) -> Self {
        let code: u8 = match err {
            TicktraderError::Io(_) => 1,
            TicktraderError::ConfigParse { .. }
            | TicktraderError::ConfigMissing { .. }
            | TicktraderError::ConfigInvalid { .. }
            | TicktraderError::UnknownStrategy { .. } => 2,
            TicktraderError::MissingInput { .. } | TicktraderError::InvalidInput { .. } => 3,
            TicktraderError::MissingParameter { .. }
            | TicktraderError::ParameterOutOfRange { .. } => 4,
            TicktraderError::TickData { .. } | TicktraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
