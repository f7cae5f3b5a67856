//! Preprocessing layers that run both eagerly and inside a host data
//! pipeline.
//!
//! A host data pipeline engine traces preprocessing functions with its own
//! tensor engine. A [`Layer`](layer::Layer) written against the
//! [`DynamicBackend`](backend::dynamic::DynamicBackend) handle it is given,
//! and wrapped in a [`PipelineLayer`](pipeline_layer::PipelineLayer), works
//! unchanged in both places: eager calls run on the native backend, and
//! calls from a pipeline trace run on the pipeline backend with their inputs
//! converted first.
//!
//! ```
//! use pipelayer::{
//!     context::PipelineTrace,
//!     layers::rescaling::Rescaling,
//!     pipeline_layer::PipelineLayer,
//!     structure::Structure,
//!     value::{RawData, Value},
//! };
//!
//! let layer = PipelineLayer::new(Rescaling::new(1.0 / 255.0, 0.0));
//! let batch = Structure::<Value>::mapping([
//!     ("image", Value::from(RawData::from(vec![0, 255]))),
//! ]);
//!
//! let outputs = PipelineTrace::run(|| layer.invoke(batch, &()))?;
//! assert!(matches!(outputs, Structure::Mapping(_)));
//! # Ok::<(), pipelayer::Error>(())
//! ```

extern crate alloc;

pub mod backend;
pub mod buffer;
pub mod context;
pub mod dtype;
pub mod error;
pub mod layer;
pub mod layers;
pub mod pipeline_layer;
pub mod structure;
pub mod tensor;
pub mod value;

pub use crate::error::{Error, Result};

#[doc(hidden)]
pub mod __private {
    #[cfg(feature = "ndarray-backend")]
    pub use ndarray;
}
