//! [`ndarray`] crate backend.

use ndarray::{ArrayD, IxDyn, ScalarOperand};
use num_traits::{Float, FromPrimitive};

use crate::{
    backend::Backend,
    buffer::Buffer,
    dtype::DType,
    error::{Error, Result},
};

/// Marker type for the [`ndarray`] backend.
#[derive(Debug, Clone, Copy)]
pub struct NdarrayBackend;

/// A dynamically-dimensioned [`ndarray`] array of one of the supported
/// element types.
#[derive(Debug, Clone, PartialEq)]
pub enum NdarrayTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Bool(ArrayD<bool>),
}

macro_rules! with_array {
    ($tensor:expr, $array:ident => $body:expr) => {
        match $tensor {
            NdarrayTensor::Float32($array) => $body,
            NdarrayTensor::Float64($array) => $body,
            NdarrayTensor::Int32($array) => $body,
            NdarrayTensor::Int64($array) => $body,
            NdarrayTensor::Bool($array) => $body,
        }
    };
}

/// Applies `op` to every element with `scalar` converted to `T`.
fn map_float<T, F>(array: &ArrayD<T>, scalar: f64, op: F) -> ArrayD<T>
where
    T: Float + FromPrimitive + ScalarOperand,
    F: Fn(T, T) -> T,
{
    let scalar = T::from_f64(scalar).unwrap_or_else(T::nan);
    array.mapv(|value| op(value, scalar))
}

/// Builds an array from `data` without checking the shape.
///
/// # Safety
///
/// See [`Backend::from_buffer()`].
unsafe fn array<T>(data: Vec<T>, shape: &[usize]) -> ArrayD<T> {
    // SAFETY: The caller has already guaranteed that the shape is valid
    // and the element count in `data` matches the shape's requirements.
    unsafe { ArrayD::from_shape_vec_unchecked(IxDyn(shape), data) }
}

impl Backend for NdarrayBackend {
    const NAME: &'static str = "ndarray";

    type Tensor = NdarrayTensor;

    #[inline]
    unsafe fn from_buffer(buffer: Buffer, shape: &[usize]) -> Self::Tensor {
        // SAFETY: Forwarded from the caller.
        unsafe {
            match buffer {
                Buffer::Float32(data) => {
                    NdarrayTensor::Float32(array(data, shape))
                }
                Buffer::Float64(data) => {
                    NdarrayTensor::Float64(array(data, shape))
                }
                Buffer::Int32(data) => NdarrayTensor::Int32(array(data, shape)),
                Buffer::Int64(data) => NdarrayTensor::Int64(array(data, shape)),
                Buffer::Bool(data) => NdarrayTensor::Bool(array(data, shape)),
            }
        }
    }

    #[inline]
    fn to_buffer(tensor: &Self::Tensor) -> Buffer {
        match tensor {
            NdarrayTensor::Float32(array) => {
                Buffer::Float32(array.iter().copied().collect())
            }
            NdarrayTensor::Float64(array) => {
                Buffer::Float64(array.iter().copied().collect())
            }
            NdarrayTensor::Int32(array) => {
                Buffer::Int32(array.iter().copied().collect())
            }
            NdarrayTensor::Int64(array) => {
                Buffer::Int64(array.iter().copied().collect())
            }
            NdarrayTensor::Bool(array) => {
                Buffer::Bool(array.iter().copied().collect())
            }
        }
    }

    #[inline]
    fn dtype(tensor: &Self::Tensor) -> DType {
        match tensor {
            NdarrayTensor::Float32(_) => DType::Float32,
            NdarrayTensor::Float64(_) => DType::Float64,
            NdarrayTensor::Int32(_) => DType::Int32,
            NdarrayTensor::Int64(_) => DType::Int64,
            NdarrayTensor::Bool(_) => DType::Bool,
        }
    }

    #[inline]
    fn shape(tensor: &Self::Tensor) -> &[usize] {
        with_array!(tensor, array => array.shape())
    }

    #[inline]
    unsafe fn zeros(shape: &[usize], dtype: DType) -> Self::Tensor {
        match dtype {
            DType::Float32 => {
                NdarrayTensor::Float32(ArrayD::zeros(IxDyn(shape)))
            }
            DType::Float64 => {
                NdarrayTensor::Float64(ArrayD::zeros(IxDyn(shape)))
            }
            DType::Int32 => NdarrayTensor::Int32(ArrayD::zeros(IxDyn(shape))),
            DType::Int64 => NdarrayTensor::Int64(ArrayD::zeros(IxDyn(shape))),
            DType::Bool => {
                NdarrayTensor::Bool(ArrayD::from_elem(IxDyn(shape), false))
            }
        }
    }

    #[inline]
    fn cast(tensor: &Self::Tensor, dtype: DType) -> Self::Tensor {
        if Self::dtype(tensor) == dtype {
            return tensor.clone();
        }

        let buffer = Self::to_buffer(tensor).cast(dtype);
        // SAFETY: Casting keeps the element count, so the existing shape
        // still matches.
        unsafe { Self::from_buffer(buffer, Self::shape(tensor)) }
    }

    #[inline]
    fn add_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor> {
        match tensor {
            NdarrayTensor::Float32(array) => Ok(NdarrayTensor::Float32(
                map_float(array, scalar, |lhs, rhs| lhs + rhs),
            )),
            NdarrayTensor::Float64(array) => Ok(NdarrayTensor::Float64(
                map_float(array, scalar, |lhs, rhs| lhs + rhs),
            )),
            NdarrayTensor::Int32(_)
            | NdarrayTensor::Int64(_)
            | NdarrayTensor::Bool(_) => Err(Error::UnsupportedDType {
                op: "add_scalar",
                dtype: Self::dtype(tensor),
            }),
        }
    }

    #[inline]
    fn mul_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor> {
        match tensor {
            NdarrayTensor::Float32(array) => Ok(NdarrayTensor::Float32(
                map_float(array, scalar, |lhs, rhs| lhs * rhs),
            )),
            NdarrayTensor::Float64(array) => Ok(NdarrayTensor::Float64(
                map_float(array, scalar, |lhs, rhs| lhs * rhs),
            )),
            NdarrayTensor::Int32(_)
            | NdarrayTensor::Int64(_)
            | NdarrayTensor::Bool(_) => Err(Error::UnsupportedDType {
                op: "mul_scalar",
                dtype: Self::dtype(tensor),
            }),
        }
    }
}
