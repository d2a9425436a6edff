//! Span bracketing around intercepted connection lifecycle calls.
use std::sync::Arc;

use anyhow::Result;

use crate::carrier::ConnectionInfo;
use crate::constants::DB_TYPE_SQL;
use crate::constants::OPERATION_INFIX;
use crate::constants::TAG_DB_INSTANCE;
use crate::constants::TAG_DB_STATEMENT;
use crate::constants::TAG_DB_TYPE;
use crate::context::TraceContext;
use crate::span::SpanLayer;

/// Stateless hook logic bracketing each intercepted call with an exit span.
///
/// The three hook-phase operations mirror the host framework contract:
/// [`before_method`](ConnectionInterceptor::before_method) opens and tags the
/// span, [`after_method`](ConnectionInterceptor::after_method) closes it and
/// [`handle_method_exception`](ConnectionInterceptor::handle_method_exception)
/// marks it failed without closing it. Hosts without their own cleanup
/// guarantee should use [`bracket`](ConnectionInterceptor::bracket) instead,
/// which closes the span on every exit path.
#[derive(Clone)]
pub struct ConnectionInterceptor {
    context: Arc<dyn TraceContext>,
}

impl ConnectionInterceptor {
    /// Create an interceptor reporting spans to the given context.
    pub fn new(context: Arc<dyn TraceContext>) -> ConnectionInterceptor {
        ConnectionInterceptor { context }
    }

    /// Create an interceptor reporting spans to the process-wide context.
    pub fn from_installed() -> ConnectionInterceptor {
        ConnectionInterceptor::new(crate::context::installed())
    }

    /// Open and tag the exit span for an intercepted call.
    ///
    /// Any method name is accepted and reflected verbatim into the span's
    /// operation name, the interceptor does not keep a list of lifecycle
    /// methods.
    pub fn before_method(&self, carrier: &ConnectionInfo, method: &str) {
        let operation = format!("{}{}{}", carrier.db_type(), OPERATION_INFIX, method);
        let remote_peer = carrier.remote_peer();
        self.context.create_exit_span(&operation, &remote_peer);

        let component = carrier.component();
        let instance = carrier.database_name().to_string();
        self.context.active_span(&mut |span| {
            span.tag(TAG_DB_TYPE, DB_TYPE_SQL);
            span.tag(TAG_DB_INSTANCE, instance.clone());
            // Connection lifecycle calls carry no SQL text.
            span.tag(TAG_DB_STATEMENT, "");
            span.set_component(component);
            span.set_layer(SpanLayer::Database);
        });
    }

    /// Close the span opened by the matching before-hook.
    ///
    /// The intercepted call's return value is passed through unchanged.
    pub fn after_method<T>(&self, ret: T) -> T {
        self.context.stop_span();
        ret
    }

    /// Mark the active span failed, recording the error detail on it.
    ///
    /// The span is NOT closed here: error-marking is content, closing is
    /// structural and belongs to the cleanup that always runs after this
    /// hook (see [`SpanBracket`]). The error itself keeps propagating to the
    /// original caller untouched.
    pub fn handle_method_exception(&self, error: &anyhow::Error) {
        let message = format!("{:#}", error);
        self.context.active_span(&mut |span| {
            span.error_occurred().log_error(message.clone());
        });
    }

    /// Run `call` inside a full span bracket.
    ///
    /// Opens and tags the span, runs the call, marks the span failed when the
    /// call errors and closes the span on every exit path, the error itself
    /// is returned to the caller unchanged.
    pub fn bracket<T, F>(&self, carrier: &ConnectionInfo, method: &str, call: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.before_method(carrier, method);
        let _bracket = SpanBracket::new(self.context.as_ref());
        let result = call();
        if let Err(error) = &result {
            self.handle_method_exception(error);
        }
        result
    }
}

/// Scoped guarantee that the active span is closed.
///
/// Dropping the guard stops the span, covering early returns, error paths
/// and panics alike. Hosts driving the hook phases themselves can hold one
/// across the intercepted call instead of relying on an external cleanup
/// guarantee.
pub struct SpanBracket<'a> {
    context: &'a dyn TraceContext,
}

impl<'a> SpanBracket<'a> {
    /// Guard the span currently active on `context`.
    pub fn new(context: &'a dyn TraceContext) -> SpanBracket<'a> {
        SpanBracket { context }
    }
}

impl Drop for SpanBracket<'_> {
    fn drop(&mut self) {
        self.context.stop_span();
    }
}
