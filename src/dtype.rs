//! Element types a tensor can hold.

use core::{fmt, str::FromStr};

use crate::error::Error;

/// The numeric precision of a tensor's elements.
///
/// Layers convert their inputs to their compute dtype before running, so
/// this is also what a [`LayerConfig`](crate::layer::LayerConfig) stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 32-bit floating point.
    #[default]
    Float32,
    /// 64-bit floating point.
    Float64,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Boolean.
    Bool,
}

impl DType {
    /// Returns the canonical name of the dtype, e.g. `"float32"`.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Bool => "bool",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_floating(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

impl fmt::Display for DType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "f32" | "float" => Ok(Self::Float32),
            "float64" | "f64" | "double" => Ok(Self::Float64),
            "int32" | "i32" => Ok(Self::Int32),
            "int64" | "i64" | "int" => Ok(Self::Int64),
            "bool" | "boolean" => Ok(Self::Bool),
            other => {
                Err(Error::InvalidConfig(format!("unknown dtype `{other}`")))
            }
        }
    }
}
