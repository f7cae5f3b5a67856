//! Leaf values a layer can be called with.

use crate::{
    buffer::{Scalar, checked_len},
    dtype::DType,
    error::{Error, Result},
    structure::Structure,
    tensor::Tensor,
};

/// Untyped array data as it arrives from a caller or a data pipeline,
/// before any backend has taken ownership of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    values: Vec<Scalar>,
    shape: Vec<usize>,
}

impl RawData {
    /// Creates raw data with an explicit row-major `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the number of values does not
    /// equal the product of the dimensions.
    #[inline]
    pub fn with_shape<S>(values: Vec<S>, shape: &[usize]) -> Result<Self>
    where
        S: Into<Scalar>,
    {
        if checked_len(shape) != Some(values.len()) {
            return Err(Error::ShapeMismatch {
                len: values.len(),
                shape: shape.to_vec(),
            });
        }

        Ok(Self {
            values: values.into_iter().map(Into::into).collect(),
            shape: shape.to_vec(),
        })
    }

    /// Creates a zero-dimensional value.
    #[inline]
    pub fn scalar<S>(value: S) -> Self
    where
        S: Into<Scalar>,
    {
        Self {
            values: vec![value.into()],
            shape: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl<S> From<Vec<S>> for RawData
where
    S: Into<Scalar>,
{
    /// Creates one-dimensional data.
    #[inline]
    fn from(values: Vec<S>) -> Self {
        let shape = vec![values.len()];
        Self {
            values: values.into_iter().map(Into::into).collect(),
            shape,
        }
    }
}

/// A placeholder for a tensor inside a graph under construction. It carries
/// a shape (with unknown dimensions as `None`) and a dtype, but no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicTensor {
    shape: Vec<Option<usize>>,
    dtype: DType,
}

impl SymbolicTensor {
    #[inline]
    #[must_use]
    pub const fn new(shape: Vec<Option<usize>>, dtype: DType) -> Self {
        Self { shape, dtype }
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> &[Option<usize>] {
        &self.shape
    }

    #[inline]
    #[must_use]
    pub const fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns a placeholder with the same shape and a different dtype.
    #[inline]
    #[must_use]
    pub fn with_dtype(&self, dtype: DType) -> Self {
        Self {
            shape: self.shape.clone(),
            dtype,
        }
    }
}

/// A leaf of a layer's input or output structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Raw(RawData),
    Tensor(Tensor),
    Symbolic(SymbolicTensor),
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_symbolic(&self) -> bool {
        matches!(self, Self::Symbolic(_))
    }

    #[inline]
    #[must_use]
    pub fn into_tensor(self) -> Option<Tensor> {
        match self {
            Self::Tensor(tensor) => Some(tensor),
            Self::Raw(_) | Self::Symbolic(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn into_symbolic(self) -> Option<SymbolicTensor> {
        match self {
            Self::Symbolic(symbolic) => Some(symbolic),
            Self::Raw(_) | Self::Tensor(_) => None,
        }
    }
}

impl From<RawData> for Value {
    #[inline]
    fn from(value: RawData) -> Self {
        Self::Raw(value)
    }
}

impl From<Tensor> for Value {
    #[inline]
    fn from(value: Tensor) -> Self {
        Self::Tensor(value)
    }
}

impl From<SymbolicTensor> for Value {
    #[inline]
    fn from(value: SymbolicTensor) -> Self {
        Self::Symbolic(value)
    }
}

impl From<RawData> for Structure<Value> {
    #[inline]
    fn from(value: RawData) -> Self {
        Self::Leaf(Value::Raw(value))
    }
}

impl From<Tensor> for Structure<Value> {
    #[inline]
    fn from(value: Tensor) -> Self {
        Self::Leaf(Value::Tensor(value))
    }
}

impl From<SymbolicTensor> for Structure<Value> {
    #[inline]
    fn from(value: SymbolicTensor) -> Self {
        Self::Leaf(Value::Symbolic(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        buffer::Scalar,
        dtype::DType,
        error::Error,
        structure::Structure,
        value::{RawData, SymbolicTensor, Value},
    };

    #[test]
    fn raw_data_from_vec_is_one_dimensional() {
        let raw = RawData::from(vec![1, 2, 3]);

        assert_eq!(raw.shape(), &[3]);
        assert_eq!(
            raw.values(),
            &[Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]
        );
    }

    #[test]
    fn raw_data_with_shape_checks_length() {
        assert!(RawData::with_shape(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).is_ok());
        assert!(RawData::with_shape(vec![1.0, 2.0, 3.0], &[2, 2]).is_err());
    }

    #[test]
    fn raw_data_with_shape_rejects_overflowing_shape() {
        assert_eq!(
            RawData::with_shape(Vec::<i32>::new(), &[usize::MAX, 2]),
            Err(Error::ShapeMismatch {
                len: 0,
                shape: vec![usize::MAX, 2],
            })
        );
        assert!(
            RawData::with_shape(Vec::<i32>::new(), &[usize::MAX, 0]).is_ok()
        );
    }

    #[test]
    fn raw_scalar_has_empty_shape() {
        let raw = RawData::scalar(true);

        assert!(raw.shape().is_empty());
        assert_eq!(raw.values(), &[Scalar::Bool(true)]);
    }

    #[test]
    fn symbolic_leaf_is_symbolic() {
        let symbolic = SymbolicTensor::new(vec![None, Some(3)], DType::Float32);
        let structure = Structure::<Value>::from(symbolic.clone());

        assert_eq!(
            structure.into_leaf().and_then(Value::into_symbolic),
            Some(symbolic)
        );
    }
}
