//! Exit-span bracketing for database connection lifecycle calls.
//!
//! The hook observes `close`, `commit`, `rollback` and `releaseSavepoint`
//! calls on database-client objects and describes each as a remote exit span:
//!
//! - [`ConnectionInfo`] carries the immutable per-connection facts (remote
//!   address, database name, component, vendor tag) spans are tagged from.
//! - [`ConnectionInterceptor`] brackets each call: the before-hook opens and
//!   tags the span, the after-hook closes it, the exception-hook marks it
//!   failed without closing it. [`ConnectionInterceptor::bracket`] runs the
//!   whole protocol around a closure with guaranteed cleanup.
//! - [`TraceContext`] is the minimal collaborator surface;
//!   [`ThreadLocalContext`] implements it over per-thread active-span stacks
//!   and [`NoopContext`] degrades tracing to no-ops.
//! - [`TracedConnection`] wraps a real connection handle together with its
//!   carrier so the instrumentation points become plain composition.
//!
//! Tracing is an out-of-band side channel: callers of the intercepted
//! methods observe no difference in return values or errors.

pub mod carrier;
pub mod connection;
pub mod constants;
pub mod context;
pub mod errors;
pub mod interceptor;
pub mod registry;
pub mod span;
pub mod testkit;

pub use self::carrier::ConnectionInfo;
pub use self::carrier::ConnectionInfoBuilder;
pub use self::connection::ConnectionLifecycle;
pub use self::connection::TracedConnection;
pub use self::constants::ComponentKind;
pub use self::context::initialise;
pub use self::context::installed;
pub use self::context::NoopContext;
pub use self::context::NullSink;
pub use self::context::SpanSink;
pub use self::context::ThreadLocalContext;
pub use self::context::TraceContext;
pub use self::interceptor::ConnectionInterceptor;
pub use self::interceptor::SpanBracket;
pub use self::span::Span;
pub use self::span::SpanLayer;
