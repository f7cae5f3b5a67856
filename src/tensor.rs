//! # The tensor module
//!
//! This module provides [`Tensor`], a multi-dimensional array that lives on
//! one of the crate's backends. Tensors are created by a
//! [`DynamicBackend`](crate::backend::dynamic::DynamicBackend), by the
//! [`tensor!`](crate::tensor!) macro, or from [`ndarray`] arrays.

#[cfg(feature = "ndarray-backend")]
use ndarray::ArrayD;

use crate::{
    backend::{Backend, BackendKind, SelectedBackend, pipeline::PipelineBackend},
    buffer::{Buffer, checked_len},
    dtype::DType,
    error::{Error, Result},
};

/// Creates a native `Tensor` from nested arrays or vectors with a
/// `vec!`-like syntax. The data type of the tensor's elements is inferred
/// from the literals.
///
/// # Examples
///
/// ```
/// use pipelayer::tensor;
///
/// // A 1D Tensor
/// let v = tensor![1.0f32, 2.0, 3.0];
///
/// // A 2D Tensor
/// let m = tensor![[1.0f64, 2.0], [3.0, 4.0]];
///
/// // The macro also works with integers.
/// let i = tensor![1i64, 2, 3];
/// ```
#[cfg(feature = "ndarray-backend")]
#[macro_export]
macro_rules! tensor {
    ($($data:tt)+) => {
        $crate::tensor::Tensor::from(
            $crate::__private::ndarray::array!($($data)+).into_dyn()
        )
    };
}

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Native(<SelectedBackend as Backend>::Tensor),
    Pipeline(<PipelineBackend as Backend>::Tensor),
}

/// A multi-dimensional array of elements of a single [`DType`], owned by
/// one backend.
///
/// Unlike statically-sized arrays, the number of dimensions (or rank) of a
/// `Tensor` is determined at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    repr: Repr,
}

macro_rules! dispatch {
    ($tensor:expr, $backend:ident, $inner:ident => $body:expr) => {
        match &$tensor.repr {
            Repr::Native($inner) => {
                type $backend = SelectedBackend;
                $body
            }
            Repr::Pipeline($inner) => {
                type $backend = PipelineBackend;
                $body
            }
        }
    };
}

impl Tensor {
    /// Builds a tensor on `backend` from row-major element storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the element count does not match
    /// the shape, or the shape's size overflows.
    #[inline]
    pub fn from_buffer(
        backend: BackendKind,
        buffer: Buffer,
        shape: &[usize],
    ) -> Result<Self> {
        if checked_len(shape) != Some(buffer.len()) {
            return Err(Error::ShapeMismatch {
                len: buffer.len(),
                shape: shape.to_vec(),
            });
        }

        // SAFETY: The element count was checked against the shape above and
        // the shape's size fits in `isize`.
        let repr = unsafe {
            match backend {
                BackendKind::Native => {
                    Repr::Native(SelectedBackend::from_buffer(buffer, shape))
                }
                BackendKind::Pipeline => {
                    Repr::Pipeline(PipelineBackend::from_buffer(buffer, shape))
                }
            }
        };

        Ok(Self { repr })
    }

    /// Creates a tensor of zeros on `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the shape's size overflows.
    #[inline]
    pub fn zeros(
        backend: BackendKind,
        shape: &[usize],
        dtype: DType,
    ) -> Result<Self> {
        if checked_len(shape).is_none() {
            return Err(Error::ShapeMismatch {
                len: 0,
                shape: shape.to_vec(),
            });
        }

        // SAFETY: The shape's size was checked above.
        let repr = unsafe {
            match backend {
                BackendKind::Native => {
                    Repr::Native(SelectedBackend::zeros(shape, dtype))
                }
                BackendKind::Pipeline => {
                    Repr::Pipeline(PipelineBackend::zeros(shape, dtype))
                }
            }
        };

        Ok(Self { repr })
    }

    /// Returns the backend that owns this tensor.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        match self.repr {
            Repr::Native(_) => BackendKind::Native,
            Repr::Pipeline(_) => BackendKind::Pipeline,
        }
    }

    #[inline]
    #[must_use]
    pub fn dtype(&self) -> DType {
        dispatch!(self, B, inner => B::dtype(inner))
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, B, inner => B::shape(inner))
    }

    #[inline]
    #[must_use]
    pub fn ndim(&self) -> usize {
        dispatch!(self, B, inner => B::ndim(inner))
    }

    /// Copies the elements out in row-major order.
    #[inline]
    #[must_use]
    pub fn to_buffer(&self) -> Buffer {
        dispatch!(self, B, inner => B::to_buffer(inner))
    }

    /// Returns a copy of this tensor owned by `backend`.
    #[inline]
    #[must_use]
    pub fn transfer(&self, backend: BackendKind) -> Self {
        if self.backend() == backend {
            return self.clone();
        }

        let shape = self.shape();
        let buffer = self.to_buffer();
        // SAFETY: The buffer came from a tensor of the same shape.
        let repr = unsafe {
            match backend {
                BackendKind::Native => {
                    Repr::Native(SelectedBackend::from_buffer(buffer, shape))
                }
                BackendKind::Pipeline => {
                    Repr::Pipeline(PipelineBackend::from_buffer(buffer, shape))
                }
            }
        };

        Self { repr }
    }

    pub(crate) fn cast(&self, dtype: DType) -> Self {
        let repr = match &self.repr {
            Repr::Native(inner) => {
                Repr::Native(SelectedBackend::cast(inner, dtype))
            }
            Repr::Pipeline(inner) => {
                Repr::Pipeline(PipelineBackend::cast(inner, dtype))
            }
        };

        Self { repr }
    }

    pub(crate) fn add_scalar(&self, scalar: f64) -> Result<Self> {
        let repr = match &self.repr {
            Repr::Native(inner) => {
                Repr::Native(SelectedBackend::add_scalar(inner, scalar)?)
            }
            Repr::Pipeline(inner) => {
                Repr::Pipeline(PipelineBackend::add_scalar(inner, scalar)?)
            }
        };

        Ok(Self { repr })
    }

    pub(crate) fn mul_scalar(&self, scalar: f64) -> Result<Self> {
        let repr = match &self.repr {
            Repr::Native(inner) => {
                Repr::Native(SelectedBackend::mul_scalar(inner, scalar)?)
            }
            Repr::Pipeline(inner) => {
                Repr::Pipeline(PipelineBackend::mul_scalar(inner, scalar)?)
            }
        };

        Ok(Self { repr })
    }
}

/// Provides interoperability with the `ndarray` crate.
///
/// Enables a direct conversion from `ndarray`'s dynamically-dimensioned
/// array types into a native `Tensor`.
#[cfg(feature = "ndarray-backend")]
macro_rules! impl_from_array {
    ($($element:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<ArrayD<$element>> for Tensor {
                #[inline]
                fn from(value: ArrayD<$element>) -> Self {
                    Self {
                        repr: Repr::Native(
                            crate::backend::ndarray::NdarrayTensor::$variant(
                                value,
                            ),
                        ),
                    }
                }
            }
        )+
    };
}

#[cfg(feature = "ndarray-backend")]
impl_from_array! {
    f32 => Float32,
    f64 => Float64,
    i32 => Int32,
    i64 => Int64,
    bool => Bool,
}
