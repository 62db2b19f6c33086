//! Error taxonomy for the evoked stage.
//!
//! Every variant except [`EvokedError::Config`] and [`EvokedError::Pool`] is
//! unit-scoped: it aborts one subject/session and is recorded by the batch
//! runner without touching the other units.
use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error carried by the I/O variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while averaging and contrasting one unit.
#[derive(Debug, Error)]
pub enum EvokedError {
    /// The epochs file is missing, unreadable or corrupt.
    #[error("failed to load epochs from {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A condition label matched no trial, or a contrast named a record that
    /// was never computed.
    #[error("unknown condition `{0}`")]
    UnknownCondition(String),

    /// Averaging was asked to reduce zero trials.
    #[error("cannot average zero trials for `{0}`")]
    EmptyAverage(String),

    /// Two records with different `[channels, samples]` dimensions were combined.
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// The evoked file could not be written.
    #[error("failed to write evoked data to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Trial data and its labels or channel names disagree.
    #[error("invalid epochs: {0}")]
    InvalidEpochs(String),

    /// The configuration is inconsistent (checked before any unit runs).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A unit's job panicked; the panic payload is kept as text.
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The worker pool could not be built.
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T, E = EvokedError> = std::result::Result<T, E>;
