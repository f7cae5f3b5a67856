//! Rescaling of input values.

use crate::{
    backend::dynamic::DynamicBackend,
    error::{Error, Result},
    layer::{Layer, LayerConfig},
    structure::Structure,
    tensor::Tensor,
};

/// Multiplies every input by `scale` and adds `offset`, after casting it to
/// the compute dtype.
///
/// To map `[0, 255]` pixel values to `[0, 1]`, use a scale of `1 / 255`; to
/// map them to `[-1, 1]`, use a scale of `1 / 127.5` and an offset of `-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rescaling {
    config: LayerConfig,
    scale: f64,
    offset: f64,
}

impl Rescaling {
    /// Creates a layer computing in `float32`.
    #[inline]
    #[must_use]
    pub fn new(scale: f64, offset: f64) -> Self {
        Self {
            config: LayerConfig::new("rescaling"),
            scale,
            offset,
        }
    }

    /// Replaces the layer's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] unless the compute dtype is floating
    /// point.
    #[inline]
    pub fn with_config(mut self, config: LayerConfig) -> Result<Self> {
        if !config.compute_dtype().is_floating() {
            return Err(Error::InvalidConfig(format!(
                "rescaling computes in floating point, got {}",
                config.compute_dtype()
            )));
        }

        self.config = config;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }
}

impl Layer for Rescaling {
    type Args = ();

    #[inline]
    fn config(&self) -> &LayerConfig {
        &self.config
    }

    #[inline]
    fn call(
        &self,
        backend: &DynamicBackend,
        inputs: Structure<Tensor>,
        _args: &(),
    ) -> Result<Structure<Tensor>> {
        let dtype = self.compute_dtype();
        inputs.try_map(|input| {
            let input = backend.cast(&input, dtype)?;
            let scaled = backend.mul_scalar(&input, self.scale)?;
            backend.add_scalar(&scaled, self.offset)
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{
        backend::BackendKind,
        buffer::Buffer,
        context::PipelineTrace,
        dtype::DType,
        layer::LayerConfig,
        layers::rescaling::Rescaling,
        pipeline_layer::PipelineLayer,
        structure::Structure,
        tensor::Tensor,
        value::{RawData, SymbolicTensor, Value},
    };

    fn only_tensor(outputs: Structure<Value>) -> Tensor {
        outputs
            .into_leaf()
            .and_then(Value::into_tensor)
            .expect("a single tensor output")
    }

    fn float32s(tensor: &Tensor) -> Vec<f32> {
        match tensor.to_buffer() {
            Buffer::Float32(values) => values,
            other => panic!("expected float32 data, got {other:?}"),
        }
    }

    #[test]
    fn rescales_pixels_to_unit_range() {
        let layer = PipelineLayer::new(Rescaling::new(1.0 / 255.0, 0.0));
        let pixels = RawData::with_shape(vec![0, 51, 255, 102], &[2, 2])
            .expect("valid shape");

        let tensor = layer
            .invoke(pixels, &())
            .map(only_tensor)
            .expect("invoke succeeds");

        assert_eq!(tensor.shape(), &[2, 2]);
        let values = float32s(&tensor);
        assert_relative_eq!(values[0], 0.0);
        assert_relative_eq!(values[1], 0.2);
        assert_relative_eq!(values[2], 1.0);
        assert_relative_eq!(values[3], 0.4);
    }

    #[test]
    fn same_result_inside_and_outside_trace() {
        let layer = PipelineLayer::new(Rescaling::new(1.0 / 127.5, -1.0));
        let pixels = || RawData::from(vec![0, 255]);

        let eager = layer.invoke(pixels(), &()).map(only_tensor);
        let traced =
            PipelineTrace::run(|| layer.invoke(pixels(), &())).map(only_tensor);

        let eager = eager.expect("eager call succeeds");
        let traced = traced.expect("traced call succeeds");
        assert_eq!(eager.backend(), BackendKind::Native);
        assert_eq!(traced.backend(), BackendKind::Pipeline);
        assert_eq!(eager.to_buffer(), traced.to_buffer());
        assert_relative_eq!(float32s(&traced)[0], -1.0);
        assert_relative_eq!(float32s(&traced)[1], 1.0);
    }

    #[test]
    fn casts_integer_tensors_to_compute_dtype() {
        let layer = Rescaling::new(2.0, 1.0)
            .with_config(LayerConfig::new("rescale").with_dtype(DType::Float64))
            .map(PipelineLayer::new)
            .expect("float64 is accepted");

        let tensor = PipelineTrace::run(|| {
            layer.invoke(crate::tensor![1i64, 2], &())
        })
        .map(only_tensor)
        .expect("invoke succeeds");

        assert_eq!(tensor.to_buffer(), Buffer::Float64(vec![3.0, 5.0]));
    }

    #[test]
    fn rejects_integer_compute_dtype() {
        let result = Rescaling::new(1.0, 0.0)
            .with_config(LayerConfig::new("rescale").with_dtype(DType::Int32));

        assert!(result.is_err());
    }

    #[test]
    fn symbolic_outputs_keep_shape() {
        let layer = PipelineLayer::new(Rescaling::new(0.5, 0.0));
        let spec =
            SymbolicTensor::new(vec![None, Some(28), Some(28)], DType::Int32);

        let outputs = PipelineTrace::run(|| layer.invoke(spec, &()));

        let output = outputs
            .ok()
            .and_then(Structure::into_leaf)
            .and_then(Value::into_symbolic)
            .expect("a symbolic output");
        assert_eq!(output.shape(), &[None, Some(28), Some(28)]);
        assert_eq!(output.dtype(), DType::Float32);
    }
}
