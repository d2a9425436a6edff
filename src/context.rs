//! Tracing-context collaborator: active-span stack management.
use std::cell::RefCell;
use std::sync::Arc;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::span::Span;

/// Singleton context handed out when embedders do not pick one explicitly.
static GLOBAL_CONTEXT: Lazy<RwLock<Option<Arc<dyn TraceContext>>>> =
    Lazy::new(|| RwLock::new(None));

thread_local! {
    /// Active-span stack for the current thread.
    ///
    /// Each thread owns its own stack so concurrent calls on different
    /// threads can never corrupt each other's span lifecycle.
    static ACTIVE_SPANS: RefCell<Vec<Span>> = RefCell::new(Vec::new());
}

/// Destination for spans once they are stopped.
///
/// How spans are sampled, batched or exported is up to the embedder.
pub trait SpanSink: Send + Sync {
    /// Take ownership of a finished span.
    fn accept(&self, span: Span);
}

/// Sink that drops every span, for embedders that only want the call bracketing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl SpanSink for NullSink {
    fn accept(&self, _: Span) {}
}

/// Minimal surface the interceptor needs from a span storage engine.
pub trait TraceContext: Send + Sync {
    /// Open a new exit span and push it onto the caller's active-span stack.
    fn create_exit_span(&self, operation_name: &str, remote_peer: &str);

    /// Run `op` against the currently active span.
    ///
    /// With no active span this is a quiet no-op so callers annotating spans
    /// on error paths degrade instead of double-faulting.
    fn active_span(&self, op: &mut dyn FnMut(&mut Span));

    /// Pop the active span, close it and hand it to the sink.
    ///
    /// # Panics
    ///
    /// Stopping with no active span is a call-bracketing protocol violation
    /// and panics: it indicates a bug in the host framework, not a runtime
    /// condition to recover from.
    fn stop_span(&self);
}

/// Reference [`TraceContext`] backed by thread-local active-span stacks.
///
/// Spans pushed by one thread are invisible to every other thread; the
/// LIFO push-on-enter/pop-on-exit discipline keeps nested calls correctly
/// paired with their spans.
pub struct ThreadLocalContext {
    logger: slog::Logger,
    sink: Arc<dyn SpanSink>,
}

impl ThreadLocalContext {
    /// Create a context logging to `logger` and draining spans into `sink`.
    pub fn new(logger: slog::Logger, sink: Arc<dyn SpanSink>) -> ThreadLocalContext {
        ThreadLocalContext { logger, sink }
    }

    /// Number of spans currently open on this thread's stack.
    pub fn depth() -> usize {
        ACTIVE_SPANS.with(|stack| stack.borrow().len())
    }
}

impl Default for ThreadLocalContext {
    fn default() -> ThreadLocalContext {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        ThreadLocalContext::new(logger, Arc::new(NullSink))
    }
}

impl TraceContext for ThreadLocalContext {
    fn create_exit_span(&self, operation_name: &str, remote_peer: &str) {
        slog::trace!(
            self.logger, "Opening exit span";
            "operation" => operation_name,
            "peer" => remote_peer
        );
        let span = Span::new(operation_name, remote_peer);
        ACTIVE_SPANS.with(|stack| stack.borrow_mut().push(span));
    }

    fn active_span(&self, op: &mut dyn FnMut(&mut Span)) {
        ACTIVE_SPANS.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.last_mut() {
                Some(span) => op(span),
                None => slog::debug!(
                    self.logger,
                    "No active span on the current thread, skipping span update"
                ),
            }
        });
    }

    fn stop_span(&self) {
        let span = ACTIVE_SPANS.with(|stack| stack.borrow_mut().pop());
        let mut span = span.expect("stop_span called with no active span on the current thread");
        span.finish();
        slog::trace!(
            self.logger, "Closed exit span";
            "operation" => span.operation_name().to_string()
        );
        self.sink.accept(span);
    }
}

/// Degrade-path [`TraceContext`]: every operation is a no-op.
///
/// Handed out when no context was initialised so tracing can never break
/// the traced system.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopContext;

impl TraceContext for NoopContext {
    fn create_exit_span(&self, _: &str, _: &str) {}
    fn active_span(&self, _: &mut dyn FnMut(&mut Span)) {}
    fn stop_span(&self) {}
}

/// Install a tracing context as the process default.
///
/// # Panics
///
/// Initialisation panics if a context has already been initialised.
pub fn initialise(context: Arc<dyn TraceContext>) {
    // Obtain a lock to initialise the global context.
    let mut global_context = GLOBAL_CONTEXT
        .write()
        .expect("GLOBAL_CONTEXT RwLock poisoned");

    // If the global context is already initialised panic (without poisoning the lock).
    if global_context.is_some() {
        drop(global_context);
        panic!("tracing context already initialised");
    }
    *global_context = Some(context);
}

/// Get the globally installed tracing context.
///
/// Returns [`NoopContext`] when no context was initialised: absence of the
/// collaborator degrades tracing to no-ops instead of failing traced calls.
pub fn installed() -> Arc<dyn TraceContext> {
    GLOBAL_CONTEXT
        .read()
        .expect("GLOBAL_CONTEXT RwLock poisoned")
        .clone()
        .unwrap_or_else(|| Arc::new(NoopContext))
}
