//! Preprocessing layers built on
//! [`PipelineLayer`](crate::pipeline_layer::PipelineLayer).

pub mod rescaling;
