//! Detection of the host pipeline's tracing context.
//!
//! The host data pipeline engine traces preprocessing functions on its own
//! threads. While it does, it holds a [`TraceScope`] open, and layers called
//! from inside the scope must produce pipeline tensors instead of native
//! ones.

use core::{cell::Cell, marker::PhantomData};

use crate::{structure::Structure, value::Value};

thread_local! {
    static TRACE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Answers whether execution currently happens inside the host pipeline's
/// tracing engine. Implementations must be pure queries.
pub trait ContextDetector {
    fn in_pipeline_trace(&self) -> bool;
}

/// Detector backed by the thread-local [`TraceScope`] depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineTrace;

impl PipelineTrace {
    /// Marks the current thread as tracing until the scope is dropped.
    /// Scopes nest.
    #[inline]
    pub fn enter() -> TraceScope {
        TRACE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        TraceScope {
            _not_send: PhantomData,
        }
    }

    /// Runs `f` inside a trace scope.
    #[inline]
    pub fn run<R, F>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _scope = Self::enter();
        f()
    }

    #[inline]
    #[must_use]
    pub fn is_active() -> bool {
        TRACE_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl ContextDetector for PipelineTrace {
    #[inline]
    fn in_pipeline_trace(&self) -> bool {
        Self::is_active()
    }
}

/// A fixed answer, for callers that know their context up front.
impl ContextDetector for bool {
    #[inline]
    fn in_pipeline_trace(&self) -> bool {
        *self
    }
}

impl<F> ContextDetector for F
where
    F: Fn() -> bool,
{
    #[inline]
    fn in_pipeline_trace(&self) -> bool {
        self()
    }
}

/// Guard returned by [`PipelineTrace::enter()`].
#[derive(Debug)]
#[must_use = "the trace ends when the scope is dropped"]
pub struct TraceScope {
    // Tied to the thread whose depth it incremented.
    _not_send: PhantomData<*const ()>,
}

impl Drop for TraceScope {
    #[inline]
    fn drop(&mut self) {
        TRACE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Returns `true` when a layer call must take the pipeline path: the
/// detector reports a trace, and no input is a symbolic placeholder (a
/// symbolic input means the call is building a graph, not processing data).
#[inline]
pub fn is_foreign_pipeline_call<D>(
    detector: &D,
    inputs: &Structure<Value>,
) -> bool
where
    D: ContextDetector + ?Sized,
{
    detector.in_pipeline_trace()
        && !inputs.any_leaf(|value| value.is_symbolic())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use crate::{
        context::{ContextDetector, PipelineTrace, is_foreign_pipeline_call},
        dtype::DType,
        structure::Structure,
        value::{RawData, SymbolicTensor, Value},
    };

    #[test]
    fn trace_is_inactive_by_default() {
        assert!(!PipelineTrace.in_pipeline_trace());
    }

    #[test]
    fn trace_scopes_nest() {
        let outer = PipelineTrace::enter();
        let inner = PipelineTrace::enter();
        drop(inner);

        assert!(PipelineTrace::is_active());

        drop(outer);
        assert!(!PipelineTrace::is_active());
    }

    #[test]
    fn run_scopes_the_closure() {
        assert!(PipelineTrace::run(PipelineTrace::is_active));
        assert!(!PipelineTrace::is_active());
    }

    #[test]
    fn trace_is_thread_local() {
        let _scope = PipelineTrace::enter();

        let other = thread::spawn(PipelineTrace::is_active).join();

        assert_eq!(other.ok(), Some(false));
        assert!(PipelineTrace::is_active());
    }

    #[test]
    fn raw_inputs_inside_trace_are_foreign_calls() {
        let inputs = Structure::<Value>::from(RawData::from(vec![1, 2, 3]));

        assert!(is_foreign_pipeline_call(&true, &inputs));
        assert!(!is_foreign_pipeline_call(&false, &inputs));
    }

    #[test]
    fn symbolic_inputs_are_never_foreign_calls() {
        let symbolic = SymbolicTensor::new(vec![None, Some(3)], DType::Float32);
        let nested = Structure::<Value>::sequence([
            Value::from(RawData::from(vec![1])),
            Value::from(symbolic.clone()),
        ]);
        let leaf = Structure::<Value>::from(symbolic);

        assert!(!is_foreign_pipeline_call(&true, &leaf));
        assert!(!is_foreign_pipeline_call(&true, &nested));
    }

    #[test]
    fn closures_act_as_detectors() {
        let inputs = Structure::<Value>::from(RawData::from(vec![1]));

        assert!(is_foreign_pipeline_call(&|| true, &inputs));
        assert!(!is_foreign_pipeline_call(&|| false, &inputs));

        let _scope = PipelineTrace::enter();
        assert!(is_foreign_pipeline_call(&PipelineTrace::is_active, &inputs));
    }
}
