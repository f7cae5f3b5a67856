//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

use crate::dtype::DType;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while converting inputs, selecting backends or running a
/// layer's computation.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An operation was requested on a [`DynamicBackend`] that is not bound
    /// to any backend.
    ///
    /// [`DynamicBackend`]: crate::backend::dynamic::DynamicBackend
    #[error("no backend is bound, cannot run `{op}`")]
    BackendUnbound { op: &'static str },

    #[error("unknown backend `{0}`")]
    UnknownBackend(String),

    /// A tensor produced by one backend was handed to an operation running
    /// on another.
    #[error("tensor belongs to backend `{actual}` but `{expected}` is bound")]
    BackendMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A leaf value cannot be represented with the requested dtype.
    #[error("cannot convert {value} to {dtype}: {reason}")]
    Conversion {
        value: String,
        dtype: DType,
        reason: &'static str,
    },

    #[error("data of length {len} does not fit shape {shape:?}")]
    ShapeMismatch { len: usize, shape: Vec<usize> },

    #[error("`{op}` is not supported for dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// Input conversion was disabled and a raw leaf reached the layer.
    #[error("layer `{layer}` received a raw value where a tensor was expected")]
    NotATensor { layer: String },

    #[error("layer `{layer}` received both symbolic and concrete inputs")]
    MixedSymbolicInputs { layer: String },

    #[error("a symbolic tensor has no data to convert")]
    SymbolicConversion,

    #[error("structures differ: {0}")]
    StructureMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure raised by a layer's own computation.
    #[error("{0}")]
    Computation(String),
}

#[cfg(test)]
mod tests {
    use crate::{dtype::DType, error::Error};

    #[test]
    fn conversion_error_message_names_value_and_dtype() {
        let error = Error::Conversion {
            value: "1.5".to_owned(),
            dtype: DType::Int32,
            reason: "value is not integral",
        };

        assert_eq!(
            error.to_string(),
            "cannot convert 1.5 to int32: value is not integral"
        );
    }

    #[test]
    fn computation_error_displays_message_verbatim() {
        let error = Error::Computation("boom".to_owned());

        assert_eq!(error.to_string(), "boom");
    }
}
