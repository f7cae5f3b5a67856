//! The base layer capability.
//!
//! A [`Layer`] describes a computation over a structure of tensors. It does
//! not call itself: [`dispatch()`] prepares the inputs (symbolic
//! placeholders go to [`Layer::compute_output_spec()`], concrete values are
//! converted to tensors of the layer's compute dtype) and then runs
//! [`Layer::call()`] with the backend handle the computation must use.

use log::debug;

use crate::{
    backend::dynamic::DynamicBackend,
    dtype::DType,
    error::{Error, Result},
    structure::Structure,
    tensor::Tensor,
    value::{SymbolicTensor, Value},
};

/// Configuration shared by every layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    name: String,
    compute_dtype: DType,
    convert_input_args: bool,
}

impl LayerConfig {
    /// Creates a configuration computing in `float32` with input conversion
    /// enabled.
    #[inline]
    pub fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            compute_dtype: DType::default(),
            convert_input_args: true,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_dtype(mut self, dtype: DType) -> Self {
        self.compute_dtype = dtype;
        self
    }

    /// Enables or disables the automatic conversion of concrete inputs to
    /// tensors before [`Layer::call()`] runs.
    #[inline]
    #[must_use]
    pub const fn with_input_conversion(mut self, enabled: bool) -> Self {
        self.convert_input_args = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub const fn compute_dtype(&self) -> DType {
        self.compute_dtype
    }

    #[inline]
    #[must_use]
    pub const fn convert_input_args(&self) -> bool {
        self.convert_input_args
    }
}

impl Default for LayerConfig {
    #[inline]
    fn default() -> Self {
        Self::new("layer")
    }
}

/// Per-call options for [`dispatch()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub convert_input_args: bool,
}

impl CallOptions {
    /// Returns these options with input conversion turned off.
    #[inline]
    #[must_use]
    pub const fn without_input_conversion(self) -> Self {
        Self {
            convert_input_args: false,
        }
    }
}

impl From<&LayerConfig> for CallOptions {
    #[inline]
    fn from(config: &LayerConfig) -> Self {
        Self {
            convert_input_args: config.convert_input_args(),
        }
    }
}

/// A computation over one structured argument.
///
/// `call` may assume its inputs are tensors of the backend bound in
/// `backend`, and must perform all tensor operations through that handle.
pub trait Layer {
    /// Extra arguments passed through to [`Layer::call()`] unconverted.
    type Args;

    fn config(&self) -> &LayerConfig;

    /// Runs the computation.
    ///
    /// # Errors
    ///
    /// Whatever the computation raises.
    fn call(
        &self,
        backend: &DynamicBackend,
        inputs: Structure<Tensor>,
        args: &Self::Args,
    ) -> Result<Structure<Tensor>>;

    /// Describes the outputs for symbolic inputs. By default every output
    /// mirrors its input's shape, in the compute dtype.
    ///
    /// # Errors
    ///
    /// Implementations fail when the inputs are not acceptable.
    #[inline]
    fn compute_output_spec(
        &self,
        inputs: &Structure<SymbolicTensor>,
        _args: &Self::Args,
    ) -> Result<Structure<SymbolicTensor>> {
        let dtype = self.compute_dtype();
        Ok(inputs.as_leaf_refs().map(|input| input.with_dtype(dtype)))
    }

    #[inline]
    fn name(&self) -> &str {
        self.config().name()
    }

    #[inline]
    fn compute_dtype(&self) -> DType {
        self.config().compute_dtype()
    }
}

/// Invokes `layer` on `inputs` with `backend`.
///
/// Symbolic inputs produce symbolic outputs through
/// [`Layer::compute_output_spec()`]. Otherwise, when
/// `options.convert_input_args` is set, raw leaves are converted to tensors
/// of the compute dtype and floating point tensors are cast to it; tensors
/// that belong to a backend other than the bound one are rejected. With
/// conversion off, tensors are passed through untouched and raw leaves are
/// rejected.
///
/// # Errors
///
/// Returns [`Error::MixedSymbolicInputs`] when symbolic and concrete leaves
/// are mixed, conversion errors, and whatever the layer raises.
#[inline]
pub fn dispatch<L>(
    layer: &L,
    backend: &DynamicBackend,
    inputs: Structure<Value>,
    args: &L::Args,
    options: CallOptions,
) -> Result<Structure<Value>>
where
    L: Layer + ?Sized,
{
    if inputs.any_leaf(|value| value.is_symbolic()) {
        let specs = inputs.try_map(|value| match value {
            Value::Symbolic(spec) => Ok(spec),
            Value::Raw(_) | Value::Tensor(_) => Err(Error::MixedSymbolicInputs {
                layer: layer.name().to_owned(),
            }),
        })?;
        debug!("layer `{}` called symbolically", layer.name());

        let outputs = layer.compute_output_spec(&specs, args)?;
        return Ok(outputs.map(Value::Symbolic));
    }

    let dtype = layer.compute_dtype();
    let tensors = inputs.try_map(|value| match value {
        Value::Raw(raw) if options.convert_input_args => {
            backend.convert_to_tensor(&raw, dtype)
        }
        Value::Tensor(tensor) if options.convert_input_args => {
            autocast(backend, &tensor, dtype)
        }
        Value::Tensor(tensor) => Ok(tensor),
        Value::Raw(_) => Err(Error::NotATensor {
            layer: layer.name().to_owned(),
        }),
        Value::Symbolic(_) => Err(Error::SymbolicConversion),
    })?;

    Ok(layer.call(backend, tensors, args)?.map(Value::Tensor))
}

/// Casts floating point tensors to a floating compute dtype; other tensors
/// keep their dtype. Either way the tensor must belong to `backend`.
fn autocast(
    backend: &DynamicBackend,
    tensor: &Tensor,
    dtype: DType,
) -> Result<Tensor> {
    let target = if tensor.dtype().is_floating() && dtype.is_floating() {
        dtype
    } else {
        tensor.dtype()
    };

    backend.cast(tensor, target)
}
