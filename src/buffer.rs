//! Typed flat element storage shared by the backends.
//!
//! A [`Buffer`] is what a backend tensor is built from and what it hands
//! back when its data is moved to another backend. Two conversion flavours
//! exist: [`Scalar::convert()`] is strict and rejects lossy conversions (it
//! backs `convert_to_tensor`), while [`Scalar::cast()`] follows the usual
//! numeric cast semantics and never fails.

use core::fmt;

use crate::{
    dtype::DType,
    error::{Error, Result},
};

/// A single element of raw input data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Converts the element to `dtype`, failing when the value cannot be
    /// represented exactly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] when a boolean is converted to a number
    /// (or the reverse), when a float with a fractional part is converted to
    /// an integer, or when the value is out of range for `dtype`.
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "every cast is range checked first"
    )]
    pub fn convert(self, dtype: DType) -> Result<Self> {
        let fail = |reason| Error::Conversion {
            value: self.to_string(),
            dtype,
            reason,
        };

        match (self, dtype) {
            (Self::Bool(_), DType::Bool) => Ok(self),
            (Self::Bool(_), _) => Err(fail("booleans are not numeric")),
            (_, DType::Bool) => Err(fail("numbers are not booleans")),
            (Self::Int(value), DType::Float32 | DType::Float64) => {
                Ok(Self::Float(value as f64))
            }
            (Self::Float(value), DType::Float32) => {
                if value.is_finite() && value.abs() > f64::from(f32::MAX) {
                    Err(fail("value is out of range"))
                } else {
                    Ok(self)
                }
            }
            (Self::Float(_), DType::Float64) => Ok(self),
            (Self::Float(value), DType::Int32 | DType::Int64) => {
                if !value.is_finite() || value.fract() != 0.0 {
                    return Err(fail("value is not integral"));
                }
                let in_range =
                    value >= i64::MIN as f64 && value < i64::MAX as f64;
                if !in_range {
                    return Err(fail("value is out of range"));
                }
                Self::Int(value as i64).convert(dtype)
            }
            (Self::Int(value), DType::Int32) => i32::try_from(value)
                .map(|_| self)
                .map_err(|_| fail("value is out of range")),
            (Self::Int(_), DType::Int64) => Ok(self),
        }
    }

    /// Casts the element to `dtype` with truncating numeric semantics.
    /// Numbers become `true` when non-zero; booleans become `0` or `1`.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "casts truncate")]
    pub fn cast(self, dtype: DType) -> Self {
        match dtype {
            DType::Bool => Self::Bool(match self {
                Self::Bool(value) => value,
                Self::Int(value) => value != 0,
                Self::Float(value) => value != 0.0,
            }),
            DType::Int32 | DType::Int64 => Self::Int(match self {
                Self::Bool(value) => i64::from(value),
                Self::Int(value) => value,
                Self::Float(value) => value as i64,
            }),
            DType::Float32 | DType::Float64 => Self::Float(self.as_f64()),
        }
    }

    /// Returns the element as an `f64`, mapping booleans to `0.0`/`1.0`.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "casts may round")]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(value) => f64::from(u8::from(value)),
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl fmt::Display for Scalar {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<bool> for Scalar {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for Scalar {
    #[inline]
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Scalar {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Row-major element storage tagged with its dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Bool(Vec<bool>),
}

impl Buffer {
    /// Builds a buffer of `dtype` from raw elements, converting each with
    /// [`Scalar::convert()`].
    ///
    /// # Errors
    ///
    /// Returns the first conversion error encountered.
    #[inline]
    pub fn from_scalars(scalars: &[Scalar], dtype: DType) -> Result<Self> {
        let converted = scalars
            .iter()
            .map(|scalar| scalar.convert(dtype))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::collect(&converted, dtype))
    }

    /// Packs already converted elements. Every element must have the
    /// variant matching `dtype`'s family.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "elements were range checked or cast beforehand"
    )]
    fn collect(scalars: &[Scalar], dtype: DType) -> Self {
        match dtype {
            DType::Float32 => Self::Float32(
                scalars.iter().map(|s| s.as_f64() as f32).collect(),
            ),
            DType::Float64 => {
                Self::Float64(scalars.iter().map(|s| s.as_f64()).collect())
            }
            DType::Int32 => Self::Int32(
                scalars
                    .iter()
                    .map(|s| match s.cast(DType::Int64) {
                        Scalar::Int(value) => value as i32,
                        Scalar::Bool(_) | Scalar::Float(_) => 0,
                    })
                    .collect(),
            ),
            DType::Int64 => Self::Int64(
                scalars
                    .iter()
                    .map(|s| match s.cast(DType::Int64) {
                        Scalar::Int(value) => value,
                        Scalar::Bool(_) | Scalar::Float(_) => 0,
                    })
                    .collect(),
            ),
            DType::Bool => Self::Bool(
                scalars
                    .iter()
                    .map(|s| matches!(s.cast(DType::Bool), Scalar::Bool(true)))
                    .collect(),
            ),
        }
    }

    #[inline]
    #[must_use]
    pub const fn dtype(&self) -> DType {
        match self {
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::Bool(_) => DType::Bool,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(data) => data.len(),
            Self::Float64(data) => data.len(),
            Self::Int32(data) => data.len(),
            Self::Int64(data) => data.len(),
            Self::Bool(data) => data.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the elements as untyped scalars.
    #[inline]
    #[must_use]
    pub fn scalars(&self) -> Vec<Scalar> {
        match self {
            Self::Float32(data) => {
                data.iter().copied().map(Scalar::from).collect()
            }
            Self::Float64(data) => {
                data.iter().copied().map(Scalar::from).collect()
            }
            Self::Int32(data) => {
                data.iter().copied().map(Scalar::from).collect()
            }
            Self::Int64(data) => {
                data.iter().copied().map(Scalar::from).collect()
            }
            Self::Bool(data) => {
                data.iter().copied().map(Scalar::from).collect()
            }
        }
    }

    /// Casts every element to `dtype`. Returns a clone when the dtype already
    /// matches.
    #[inline]
    #[must_use]
    pub fn cast(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }

        let cast = self
            .scalars()
            .into_iter()
            .map(|scalar| scalar.cast(dtype))
            .collect::<Vec<_>>();

        Self::collect(&cast, dtype)
    }
}

/// Number of elements described by `shape`, if it fits in `isize`.
pub(crate) fn checked_len(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1_usize, |len, &dim| len.checked_mul(dim))
        .filter(|&len| isize::try_from(len).is_ok())
}
