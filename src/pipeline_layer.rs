//! Layers that can run inside the host data pipeline.
//!
//! The host pipeline engine traces preprocessing functions with its own
//! tensor engine, which is usually not the backend the crate is configured
//! with. [`PipelineLayer`] wraps a [`Layer`] so that the same computation
//! works in both places: during ordinary execution it forwards to the layer
//! untouched, and inside a pipeline trace it runs the layer on the
//! [interop backend](BackendKind::INTEROP), converting the inputs itself.
//!
//! The backend selection is scoped to a single call. Nothing about a call is
//! stored on the wrapper, so nested and concurrent calls on one instance do
//! not observe each other.

use log::debug;

use crate::{
    backend::{BackendKind, dynamic::DynamicBackend},
    context::{ContextDetector, PipelineTrace, is_foreign_pipeline_call},
    error::Result,
    layer::{self, CallOptions, Layer},
    structure::Structure,
    value::Value,
};

/// Wraps a [`Layer`] so it can be called from a pipeline trace.
///
/// The layer's [`call`](Layer::call) must perform all tensor operations
/// through the backend handle it receives.
///
/// # Examples
///
/// ```
/// use pipelayer::{
///     backend::BackendKind,
///     context::PipelineTrace,
///     layers::rescaling::Rescaling,
///     pipeline_layer::PipelineLayer,
///     value::{RawData, Value},
/// };
///
/// let layer = PipelineLayer::new(Rescaling::new(0.5, 1.0));
///
/// let eager = layer.invoke(RawData::from(vec![2, 4]), &()).unwrap();
/// let traced =
///     PipelineTrace::run(|| layer.invoke(RawData::from(vec![2, 4]), &()))
///         .unwrap();
///
/// let eager = eager.into_leaf().and_then(Value::into_tensor).unwrap();
/// let traced = traced.into_leaf().and_then(Value::into_tensor).unwrap();
/// assert_eq!(eager.backend(), BackendKind::Native);
/// assert_eq!(traced.backend(), BackendKind::Pipeline);
/// assert_eq!(eager.to_buffer(), traced.to_buffer());
/// ```
#[derive(Debug, Clone)]
pub struct PipelineLayer<L, D = PipelineTrace> {
    layer: L,
    detector: D,
}

impl<L> PipelineLayer<L>
where
    L: Layer,
{
    /// Wraps `layer`, detecting pipeline traces through [`PipelineTrace`].
    #[inline]
    pub const fn new(layer: L) -> Self {
        Self {
            layer,
            detector: PipelineTrace,
        }
    }
}

impl<L, D> PipelineLayer<L, D>
where
    L: Layer,
    D: ContextDetector,
{
    /// Wraps `layer` with a custom context detector.
    #[inline]
    pub const fn with_detector(layer: L, detector: D) -> Self {
        Self { layer, detector }
    }

    #[inline]
    pub const fn layer(&self) -> &L {
        &self.layer
    }

    /// Calls the wrapped layer on `inputs`.
    ///
    /// Outside a pipeline trace, or when the inputs are symbolic, this is
    /// exactly [`layer::dispatch()`] on the native backend. Inside a trace,
    /// every leaf is converted to a tensor of the layer's compute dtype on
    /// the interop backend and the layer runs on that backend with its own
    /// input conversion turned off. The backend binding is released on every
    /// exit path and errors are returned unchanged.
    ///
    /// # Errors
    ///
    /// Conversion errors for leaves that cannot be represented in the
    /// compute dtype, and whatever the layer raises.
    #[inline]
    pub fn invoke<I>(
        &self,
        inputs: I,
        args: &L::Args,
    ) -> Result<Structure<Value>>
    where
        I: Into<Structure<Value>>,
    {
        let inputs = inputs.into();
        let options = CallOptions::from(self.layer.config());

        if !is_foreign_pipeline_call(&self.detector, &inputs) {
            return layer::dispatch(
                &self.layer,
                &DynamicBackend::native(),
                inputs,
                args,
                options,
            );
        }

        debug!(
            "layer `{}` called from a pipeline trace, running on `{}`",
            self.layer.name(),
            BackendKind::INTEROP
        );

        let mut handle = DynamicBackend::new();
        let backend = handle.bind(BackendKind::INTEROP);
        let dtype = self.layer.compute_dtype();
        let inputs = inputs.try_map(|value| {
            backend.convert_value(&value, dtype).map(Value::Tensor)
        })?;

        layer::dispatch(
            &self.layer,
            &backend,
            inputs,
            args,
            options.without_input_conversion(),
        )
    }
}

impl<L> From<L> for PipelineLayer<L>
where
    L: Layer,
{
    #[inline]
    fn from(layer: L) -> Self {
        Self::new(layer)
    }
}
