use thiserror::Error;

/// Errors that may surface while configuring or running an afines simulation.
///
/// `Invariant` and `Numeric` are fatal: the driver logs the diagnostic (which
/// carries the offending time step and indices) and aborts the run. `Config`
/// and `Io` map to the nonzero exit codes of the driver; a `Logic` error means
/// the configuration named a capability (e.g. an external force kind) the
/// engine does not implement.
#[derive(Debug, Error)]
pub enum AfinesError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("invariant violated at t={t}: {detail}")]
    Invariant { t: f64, detail: String },

    #[error("non-finite value at t={t}: {detail}")]
    Numeric { t: f64, detail: String },

    #[error("unsupported configuration: {0}")]
    Logic(String),
}

pub type Result<T> = std::result::Result<T, AfinesError>;
