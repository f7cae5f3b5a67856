//! Runtime backend selection.
//!
//! A [`DynamicBackend`] is a handle that points at one of the crate's
//! backends, or at none. Layer bodies run all their tensor operations
//! through the handle they are given, so the same body produces native
//! tensors during ordinary execution and pipeline tensors while the host
//! pipeline engine traces it.

use core::ops::Deref;

use log::trace;

use crate::{
    backend::BackendKind,
    buffer::Buffer,
    dtype::DType,
    error::{Error, Result},
    tensor::Tensor,
    value::{RawData, Value},
};

/// A switchable pointer to a backend.
///
/// Every operation fails with [`Error::BackendUnbound`] while the handle is
/// not bound, and with [`Error::BackendMismatch`] when given a tensor that
/// belongs to a different backend than the bound one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynamicBackend {
    backend: Option<BackendKind>,
}

impl DynamicBackend {
    /// Creates an unbound handle.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { backend: None }
    }

    /// Creates a handle bound to `backend`.
    #[inline]
    #[must_use]
    pub const fn bound_to(backend: BackendKind) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Creates a handle bound to the backend configured for ordinary
    /// execution.
    #[inline]
    #[must_use]
    pub const fn native() -> Self {
        Self::bound_to(BackendKind::Native)
    }

    /// Returns the bound backend, if any.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> Option<BackendKind> {
        self.backend
    }

    #[inline]
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.backend.is_some()
    }

    /// Points the handle at the backend called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] if no backend has that name. The
    /// handle is left unchanged in that case.
    #[inline]
    pub fn set_backend(&mut self, name: &str) -> Result<()> {
        let backend = BackendKind::from_name(name)?;
        trace!("binding dynamic backend to `{backend}`");
        self.backend = Some(backend);
        Ok(())
    }

    /// Unbinds the handle.
    #[inline]
    pub fn reset(&mut self) {
        if let Some(backend) = self.backend.take() {
            trace!("releasing dynamic backend `{backend}`");
        }
    }

    /// Binds the handle to `backend` until the returned guard is dropped.
    ///
    /// The guard dereferences to the handle and resets it when it goes out
    /// of scope, whether the scope is left normally, through `?` or by
    /// unwinding.
    #[inline]
    pub fn bind(&mut self, backend: BackendKind) -> BackendBinding<'_> {
        trace!("binding dynamic backend to `{backend}`");
        self.backend = Some(backend);
        BackendBinding { handle: self }
    }

    fn require(&self, op: &'static str) -> Result<BackendKind> {
        self.backend.ok_or(Error::BackendUnbound { op })
    }

    fn require_owned(
        &self,
        tensor: &Tensor,
        op: &'static str,
    ) -> Result<BackendKind> {
        let backend = self.require(op)?;
        if tensor.backend() != backend {
            return Err(Error::BackendMismatch {
                expected: backend.name(),
                actual: tensor.backend().name(),
            });
        }

        Ok(backend)
    }

    /// Converts raw data into a tensor of `dtype` on the bound backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BackendUnbound`] if the handle is unbound and
    /// [`Error::Conversion`] if an element cannot be represented as `dtype`.
    #[inline]
    pub fn convert_to_tensor(
        &self,
        raw: &RawData,
        dtype: DType,
    ) -> Result<Tensor> {
        let backend = self.require("convert_to_tensor")?;
        let buffer = Buffer::from_scalars(raw.values(), dtype)?;

        Tensor::from_buffer(backend, buffer, raw.shape())
    }

    /// Converts any concrete leaf into a tensor of `dtype` on the bound
    /// backend. Tensors from another backend are copied over, and tensors of
    /// another dtype are cast.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolicConversion`] for symbolic placeholders, plus
    /// the errors of [`DynamicBackend::convert_to_tensor()`].
    #[inline]
    pub fn convert_value(&self, value: &Value, dtype: DType) -> Result<Tensor> {
        match value {
            Value::Raw(raw) => self.convert_to_tensor(raw, dtype),
            Value::Tensor(tensor) => {
                let backend = self.require("convert_to_tensor")?;
                let tensor = tensor.transfer(backend);
                if tensor.dtype() == dtype {
                    Ok(tensor)
                } else {
                    Ok(tensor.cast(dtype))
                }
            }
            Value::Symbolic(_) => Err(Error::SymbolicConversion),
        }
    }

    /// Casts `tensor` to `dtype`.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unbound or `tensor` lives on another backend.
    #[inline]
    pub fn cast(&self, tensor: &Tensor, dtype: DType) -> Result<Tensor> {
        let _backend = self.require_owned(tensor, "cast")?;
        Ok(tensor.cast(dtype))
    }

    /// Adds `scalar` to every element of a floating point tensor.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unbound, `tensor` lives on another backend or
    /// is not floating point.
    #[inline]
    pub fn add_scalar(&self, tensor: &Tensor, scalar: f64) -> Result<Tensor> {
        let _backend = self.require_owned(tensor, "add_scalar")?;
        tensor.add_scalar(scalar)
    }

    /// Multiplies every element of a floating point tensor by `scalar`.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unbound, `tensor` lives on another backend or
    /// is not floating point.
    #[inline]
    pub fn mul_scalar(&self, tensor: &Tensor, scalar: f64) -> Result<Tensor> {
        let _backend = self.require_owned(tensor, "mul_scalar")?;
        tensor.mul_scalar(scalar)
    }

    /// Creates a tensor of zeros on the bound backend.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unbound or the shape's size overflows.
    #[inline]
    pub fn zeros(&self, shape: &[usize], dtype: DType) -> Result<Tensor> {
        let backend = self.require("zeros")?;
        Tensor::zeros(backend, shape, dtype)
    }
}

/// A scoped binding of a [`DynamicBackend`], see
/// [`DynamicBackend::bind()`].
#[derive(Debug)]
pub struct BackendBinding<'a> {
    handle: &'a mut DynamicBackend,
}

impl Deref for BackendBinding<'_> {
    type Target = DynamicBackend;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &*self.handle
    }
}

impl Drop for BackendBinding<'_> {
    #[inline]
    fn drop(&mut self) {
        self.handle.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use approx::assert_relative_eq;

    use crate::{
        backend::{BackendKind, dynamic::DynamicBackend},
        buffer::Buffer,
        dtype::DType,
        error::{Error, Result},
        value::{RawData, SymbolicTensor, Value},
    };

    #[test]
    fn new_handle_is_unbound() {
        let handle = DynamicBackend::new();

        assert!(!handle.is_bound());
        assert_eq!(handle, DynamicBackend::default());
    }

    #[test]
    fn set_backend_and_reset() {
        let mut handle = DynamicBackend::new();

        assert_eq!(handle.set_backend("pipeline"), Ok(()));
        assert_eq!(handle.current(), Some(BackendKind::Pipeline));

        handle.reset();
        assert_eq!(handle.current(), None);
    }

    #[test]
    fn set_backend_rejects_unknown_name_and_keeps_binding() {
        let mut handle = DynamicBackend::native();

        assert_eq!(
            handle.set_backend("jax"),
            Err(Error::UnknownBackend("jax".to_owned()))
        );
        assert_eq!(handle.current(), Some(BackendKind::Native));
    }

    #[test]
    fn unbound_handle_refuses_to_convert() {
        let handle = DynamicBackend::new();
        let raw = RawData::from(vec![1, 2, 3]);

        assert_eq!(
            handle.convert_to_tensor(&raw, DType::Float32),
            Err(Error::BackendUnbound {
                op: "convert_to_tensor"
            })
        );
    }

    #[test]
    fn convert_to_tensor_targets_bound_backend() {
        let handle = DynamicBackend::bound_to(BackendKind::Pipeline);
        let raw = RawData::from(vec![1, 2, 3]);

        let tensor = handle.convert_to_tensor(&raw, DType::Float32);

        let tensor = tensor.expect("conversion succeeds");
        assert_eq!(tensor.backend(), BackendKind::Pipeline);
        assert_eq!(tensor.shape(), &[3]);
        assert_eq!(tensor.to_buffer(), Buffer::Float32(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn convert_to_tensor_reports_lossy_values() {
        let handle = DynamicBackend::native();
        let raw = RawData::from(vec![0.5, 1.0]);

        assert!(matches!(
            handle.convert_to_tensor(&raw, DType::Int64),
            Err(Error::Conversion {
                dtype: DType::Int64,
                ..
            })
        ));
    }

    #[test]
    fn convert_value_transfers_and_casts_tensors() {
        let handle = DynamicBackend::bound_to(BackendKind::Pipeline);
        let native = crate::tensor![1i32, 2];

        let converted =
            handle.convert_value(&Value::Tensor(native), DType::Float64);

        let converted = converted.expect("conversion succeeds");
        assert_eq!(converted.backend(), BackendKind::Pipeline);
        assert_eq!(converted.to_buffer(), Buffer::Float64(vec![1.0, 2.0]));
    }

    #[test]
    fn convert_value_rejects_symbolic_tensors() {
        let handle = DynamicBackend::native();
        let symbolic = SymbolicTensor::new(vec![None], DType::Float32);

        assert_eq!(
            handle.convert_value(&Value::Symbolic(symbolic), DType::Float32),
            Err(Error::SymbolicConversion)
        );
    }

    #[test]
    fn ops_reject_tensors_from_other_backends() {
        let handle = DynamicBackend::bound_to(BackendKind::Pipeline);
        let native = crate::tensor![1.0f32, 2.0];

        assert_eq!(
            handle.add_scalar(&native, 1.0),
            Err(Error::BackendMismatch {
                expected: "pipeline",
                actual: "ndarray",
            })
        );
    }

    #[test]
    fn ops_run_on_bound_backend() {
        let handle = DynamicBackend::native();
        let tensor = crate::tensor![1.0f64, 2.0];

        let result = handle
            .mul_scalar(&tensor, 3.0)
            .and_then(|tensor| handle.add_scalar(&tensor, 0.5));

        let Buffer::Float64(values) =
            result.expect("ops succeed").to_buffer()
        else {
            panic!("expected float64 data");
        };
        assert_relative_eq!(values[0], 3.5);
        assert_relative_eq!(values[1], 6.5);
    }

    #[test]
    fn zeros_are_created_on_bound_backend() {
        let handle = DynamicBackend::bound_to(BackendKind::Pipeline);

        let zeros = handle.zeros(&[2], DType::Bool).expect("zeros succeed");

        assert_eq!(zeros.backend(), BackendKind::Pipeline);
        assert_eq!(zeros.to_buffer(), Buffer::Bool(vec![false, false]));
    }

    #[test]
    fn binding_resets_handle_on_drop() {
        let mut handle = DynamicBackend::new();

        {
            let binding = handle.bind(BackendKind::Pipeline);
            assert_eq!(binding.current(), Some(BackendKind::Pipeline));
        }

        assert!(!handle.is_bound());
    }

    #[test]
    fn binding_resets_handle_on_error() {
        fn fails(handle: &mut DynamicBackend) -> Result<()> {
            let binding = handle.bind(BackendKind::Pipeline);
            let _tensor = binding
                .convert_to_tensor(&RawData::from(vec![true]), DType::Float32)?;
            Ok(())
        }

        let mut handle = DynamicBackend::new();

        assert!(fails(&mut handle).is_err());
        assert!(!handle.is_bound());
    }

    #[test]
    fn binding_resets_handle_on_panic() {
        let mut handle = DynamicBackend::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let binding = handle.bind(BackendKind::Pipeline);
            if binding.is_bound() {
                panic!("layer body panicked");
            }
        }));

        assert!(result.is_err());
        assert!(!handle.is_bound());
    }
}
