//! Test doubles for the tracing-context collaborator.
use std::sync::Mutex;

use crate::context::SpanSink;
use crate::context::TraceContext;
use crate::span::Span;

/// Sink keeping finished spans in memory for assertions.
#[derive(Debug, Default)]
pub struct MemorySink {
    spans: Mutex<Vec<Span>>,
}

impl MemorySink {
    /// Snapshot of the spans accepted so far, in acceptance order.
    pub fn finished(&self) -> Vec<Span> {
        self.spans.lock().expect("MemorySink Mutex poisoned").clone()
    }
}

impl SpanSink for MemorySink {
    fn accept(&self, span: Span) {
        self.spans
            .lock()
            .expect("MemorySink Mutex poisoned")
            .push(span);
    }
}

/// One call observed by a [`RecordingContext`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContextCall {
    CreateExitSpan {
        operation_name: String,
        remote_peer: String,
    },
    ActiveSpan,
    StopSpan,
}

#[derive(Debug, Default)]
struct RecordingState {
    stack: Vec<Span>,
    finished: Vec<Span>,
    calls: Vec<ContextCall>,
}

/// Context double recording every collaborator call it receives.
///
/// The span stack is per-instance rather than per-thread: doubles are meant
/// to be owned by a single test, the thread-local discipline itself is
/// covered by [`ThreadLocalContext`](crate::context::ThreadLocalContext)
/// tests.
#[derive(Debug, Default)]
pub struct RecordingContext {
    state: Mutex<RecordingState>,
}

impl RecordingContext {
    /// Snapshot of the spans stopped so far, in stop order.
    pub fn finished(&self) -> Vec<Span> {
        self.lock().finished.clone()
    }

    /// Every collaborator call received so far, in order.
    pub fn calls(&self) -> Vec<ContextCall> {
        self.lock().calls.clone()
    }

    /// Number of spans currently open on the double's stack.
    pub fn depth(&self) -> usize {
        self.lock().stack.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().expect("RecordingContext Mutex poisoned")
    }
}

impl TraceContext for RecordingContext {
    fn create_exit_span(&self, operation_name: &str, remote_peer: &str) {
        let mut state = self.lock();
        state.calls.push(ContextCall::CreateExitSpan {
            operation_name: operation_name.to_string(),
            remote_peer: remote_peer.to_string(),
        });
        state.stack.push(Span::new(operation_name, remote_peer));
    }

    fn active_span(&self, op: &mut dyn FnMut(&mut Span)) {
        let mut state = self.lock();
        state.calls.push(ContextCall::ActiveSpan);
        if let Some(span) = state.stack.last_mut() {
            op(span);
        }
    }

    fn stop_span(&self) {
        let mut state = self.lock();
        state.calls.push(ContextCall::StopSpan);
        let mut span = state
            .stack
            .pop()
            .expect("stop_span called with no active span on the double");
        span.finish();
        state.finished.push(span);
    }
}
