//! The generic computational backends.
//!
//! This module provides the [`Backend`] trait which defines the contract for
//! tensor creation, data exchange and the handful of element-wise operations
//! a preprocessing layer needs.
//!
//! Two backends exist side by side. The native backend ([`SelectedBackend`],
//! [`ndarray`] by default, swapped out with crate feature flags) is what
//! layers run on during ordinary execution. The [`pipeline`] backend speaks
//! the tensor format of the host data pipeline engine and is what layers
//! must use while that engine traces them. [`dynamic::DynamicBackend`]
//! switches between the two at runtime.

pub mod dynamic;
#[cfg(feature = "ndarray-backend")]
pub mod ndarray;
pub mod pipeline;

use core::fmt;

use crate::{
    buffer::Buffer,
    dtype::DType,
    error::{Error, Result},
};

/// A trait that defines the contract every backend must fulfill.
///
/// All functions are pure. Some are marked `unsafe` because they do not
/// check that a buffer's length agrees with the requested shape. The caller
/// (typically the [`Tensor`](crate::tensor::Tensor) wrapper) is responsible
/// for ensuring all preconditions are met before calling these functions.
pub trait Backend {
    /// The name the backend is selected by.
    const NAME: &'static str;

    /// The concrete tensor representation provided by the backend.
    type Tensor: Clone + fmt::Debug + PartialEq;

    /// Builds a tensor from row-major element storage.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `buffer.len()` equals the product of the
    /// dimensions in `shape` and that the product does not overflow
    /// [`isize::MAX`].
    unsafe fn from_buffer(buffer: Buffer, shape: &[usize]) -> Self::Tensor;

    /// Copies the tensor's elements out in row-major order.
    fn to_buffer(tensor: &Self::Tensor) -> Buffer;

    /// Returns the element type of the tensor.
    fn dtype(tensor: &Self::Tensor) -> DType;

    /// Returns the shape of the tensor as a slice of dimensions.
    fn shape(tensor: &Self::Tensor) -> &[usize];

    /// Returns the number of dimensions of the tensor.
    #[inline]
    fn ndim(tensor: &Self::Tensor) -> usize {
        Self::shape(tensor).len()
    }

    /// Creates a tensor of the given dtype with all elements set to zero.
    ///
    /// # Safety
    ///
    /// The caller must ensure that no dimensions overflow `isize` and the
    /// product of axis lengths does not overflow [`isize::MAX`].
    unsafe fn zeros(shape: &[usize], dtype: DType) -> Self::Tensor;

    /// Casts every element to `dtype`.
    fn cast(tensor: &Self::Tensor, dtype: DType) -> Self::Tensor;

    /// Adds `scalar` to every element of a floating point tensor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDType`] for non-floating tensors.
    fn add_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor>;

    /// Multiplies every element of a floating point tensor by `scalar`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDType`] for non-floating tensors.
    fn mul_scalar(tensor: &Self::Tensor, scalar: f64) -> Result<Self::Tensor>;
}

cfg_if::cfg_if! {
    if #[cfg(feature = "ndarray-backend")] {
        /// Dynamically configured type alias for the native backend, based
        /// on crate feature flags.
        pub type SelectedBackend = ndarray::NdarrayBackend;
    } else {
        compile_error!(
            "A backend feature must be enabled. Available: `ndarray-backend`"
        );
    }
}

/// Identifies one of the backends a [`Tensor`](crate::tensor::Tensor) can
/// live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// The backend selected at compile time, see [`SelectedBackend`].
    Native,
    /// The host data pipeline's tensor engine.
    Pipeline,
}

impl BackendKind {
    /// The backend layers must run on while the host pipeline engine traces
    /// them.
    pub const INTEROP: Self = Self::Pipeline;

    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Native => SelectedBackend::NAME,
            Self::Pipeline => pipeline::PipelineBackend::NAME,
        }
    }

    /// Looks a backend up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] if no backend has that name.
    #[inline]
    pub fn from_name(name: &str) -> Result<Self> {
        [Self::Native, Self::Pipeline]
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| Error::UnknownBackend(name.to_owned()))
    }
}

impl fmt::Display for BackendKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::BackendKind;

    #[test]
    fn backend_kind_names_round_trip() {
        for kind in [BackendKind::Native, BackendKind::Pipeline] {
            assert_eq!(BackendKind::from_name(kind.name()), Ok(kind));
        }
    }

    #[test]
    fn native_backend_is_ndarray_by_default() {
        assert_eq!(BackendKind::Native.name(), "ndarray");
    }

    #[test]
    fn interop_backend_is_pipeline() {
        assert_eq!(BackendKind::INTEROP.name(), "pipeline");
    }

    #[test]
    fn unknown_backend_names_are_rejected() {
        assert!(BackendKind::from_name("tensorflow").is_err());
    }
}
