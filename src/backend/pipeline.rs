//! Backend for the host data pipeline engine.
//!
//! The pipeline engine traces preprocessing functions and feeds them its own
//! tensors: a flat row-major buffer plus a shape. Layers running inside the
//! engine must produce tensors in this format, which is what this backend
//! does.

use core::ops::{Add, Mul};

use crate::{
    backend::Backend,
    buffer::Buffer,
    dtype::DType,
    error::{Error, Result},
};

/// Marker type for the pipeline backend.
#[derive(Debug, Clone, Copy)]
pub struct PipelineBackend;

/// A tensor in the host pipeline engine's representation.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineTensor {
    shape: Vec<usize>,
    buffer: Buffer,
}

impl PipelineTensor {
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

#[derive(Debug, Clone, Copy)]
enum ScalarOp {
    Add,
    Mul,
}

impl ScalarOp {
    const fn name(self) -> &'static str {
        match self {
            Self::Add => "add_scalar",
            Self::Mul => "mul_scalar",
        }
    }

    fn apply<T>(self, lhs: T, rhs: T) -> T
    where
        T: Add<Output = T> + Mul<Output = T>,
    {
        match self {
            Self::Add => lhs + rhs,
            Self::Mul => lhs * rhs,
        }
    }
}

/// Applies `op` element-wise in the tensor's own precision.
fn map_float(
    tensor: &PipelineTensor,
    op: ScalarOp,
    scalar: f64,
) -> Result<PipelineTensor> {
    let buffer = match &tensor.buffer {
        Buffer::Float32(data) => {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the scalar is applied in float32"
            )]
            let scalar = scalar as f32;
            Buffer::Float32(
                data.iter().map(|&value| op.apply(value, scalar)).collect(),
            )
        }
        Buffer::Float64(data) => Buffer::Float64(
            data.iter().map(|&value| op.apply(value, scalar)).collect(),
        ),
        Buffer::Int32(_) | Buffer::Int64(_) | Buffer::Bool(_) => {
            return Err(Error::UnsupportedDType {
                op: op.name(),
                dtype: tensor.buffer.dtype(),
            });
        }
    };

    Ok(PipelineTensor {
        shape: tensor.shape.clone(),
        buffer,
    })
}

impl Backend for PipelineBackend {
    const NAME: &'static str = "pipeline";

    type Tensor = PipelineTensor;

    #[inline]
    unsafe fn from_buffer(buffer: Buffer, shape: &[usize]) -> Self::Tensor {
        PipelineTensor {
            shape: shape.to_vec(),
            buffer,
        }
    }

    #[inline]
    fn to_buffer(tensor: &Self::Tensor) -> Buffer {
        tensor.buffer.clone()
    }

    #[inline]
    fn dtype(tensor: &Self::Tensor) -> DType {
        tensor.buffer.dtype()
    }

    #[inline]
    fn shape(tensor: &Self::Tensor) -> &[usize] {
        &tensor.shape
    }

    #[inline]
    unsafe fn zeros(shape: &[usize], dtype: DType) -> Self::Tensor {
        let len = shape.iter().product();
        let buffer = match dtype {
            DType::Float32 => Buffer::Float32(vec![0.0; len]),
            DType::Float64 => Buffer::Float64(vec![0.0; len]),
            DType::Int32 => Buffer::Int32(vec![0; len]),
            DType::Int64 => Buffer::Int64(vec![0; len]),
            DType::Bool => Buffer::Bool(vec![false; len]),
        };

        PipelineTensor {
            shape: shape.to_vec(),
            buffer,
        }
    }

    #[inline]
    fn cast(tensor: &Self::Tensor, dtype: DType) -> Self::Tensor {
        PipelineTensor {
            shape: tensor.shape.clone(),
            buffer: tensor.buffer.cast(dtype),
        }
    }

    #[inline]
    fn add_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor> {
        map_float(tensor, ScalarOp::Add, scalar)
    }

    #[inline]
    fn mul_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor> {
        map_float(tensor, ScalarOp::Mul, scalar)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        backend::{Backend, pipeline::PipelineBackend},
        buffer::Buffer,
        dtype::DType,
        error::Error,
    };

    #[test]
    fn pipeline_zeros_has_correct_shape_and_values() {
        let tensor = unsafe { PipelineBackend::zeros(&[2, 3], DType::Float64) };

        assert_eq!(PipelineBackend::shape(&tensor), &[2, 3]);
        assert_eq!(tensor.buffer(), &Buffer::Float64(vec![0.0; 6]));
    }

    #[test]
    fn pipeline_cast_converts_buffer() {
        let tensor = unsafe {
            PipelineBackend::from_buffer(Buffer::Int64(vec![0, 3]), &[2])
        };

        let cast = PipelineBackend::cast(&tensor, DType::Bool);

        assert_eq!(cast.buffer(), &Buffer::Bool(vec![false, true]));
        assert_eq!(PipelineBackend::shape(&cast), &[2]);
    }

    #[test]
    fn pipeline_scalar_ops_work_on_float32() {
        let tensor = unsafe {
            PipelineBackend::from_buffer(Buffer::Float32(vec![1.0, 2.0]), &[2])
        };

        let scaled = PipelineBackend::mul_scalar(&tensor, 2.0)
            .and_then(|tensor| PipelineBackend::add_scalar(&tensor, 1.0));

        assert_eq!(
            scaled.map(|tensor| PipelineBackend::to_buffer(&tensor)),
            Ok(Buffer::Float32(vec![3.0, 5.0]))
        );
    }

    #[test]
    fn pipeline_scalar_ops_reject_booleans() {
        let tensor = unsafe {
            PipelineBackend::from_buffer(Buffer::Bool(vec![true]), &[1])
        };

        assert_eq!(
            PipelineBackend::add_scalar(&tensor, 1.0),
            Err(Error::UnsupportedDType {
                op: "add_scalar",
                dtype: DType::Bool,
            })
        );
    }
}
