//! Tracing-aware wrapper around database connection handles.
use std::sync::Arc;

use anyhow::Result;

use crate::carrier::ConnectionInfo;
use crate::constants::METHOD_CLOSE;
use crate::constants::METHOD_COMMIT;
use crate::constants::METHOD_RELEASE_SAVEPOINT;
use crate::constants::METHOD_ROLLBACK;
use crate::context::TraceContext;
use crate::interceptor::ConnectionInterceptor;

/// Lifecycle surface of a database connection the hook observes.
pub trait ConnectionLifecycle {
    /// Close the connection.
    fn close(&mut self) -> Result<()>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Release the most recent savepoint.
    fn release_savepoint(&mut self) -> Result<()>;
}

/// Decorator tracing every lifecycle call on the wrapped connection.
///
/// Owns both the real connection handle and its metadata carrier, which
/// replaces the dynamic-field attachment of instrumentation frameworks with
/// plain composition. Callers observe no behavioural difference: return
/// values and errors pass through unchanged, spans are an out-of-band side
/// channel.
pub struct TracedConnection<C: ConnectionLifecycle> {
    inner: C,
    info: ConnectionInfo,
    interceptor: ConnectionInterceptor,
}

impl<C: ConnectionLifecycle> TracedConnection<C> {
    /// Wrap a connection, reporting spans to the process-wide context.
    pub fn new(inner: C, info: ConnectionInfo) -> TracedConnection<C> {
        TracedConnection {
            inner,
            info,
            interceptor: ConnectionInterceptor::from_installed(),
        }
    }

    /// Wrap a connection, reporting spans to an explicit context.
    pub fn with_context(
        inner: C,
        info: ConnectionInfo,
        context: Arc<dyn TraceContext>,
    ) -> TracedConnection<C> {
        TracedConnection {
            inner,
            info,
            interceptor: ConnectionInterceptor::new(context),
        }
    }

    /// Metadata carrier attached to this connection.
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Give up tracing and return the wrapped connection.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: ConnectionLifecycle> ConnectionLifecycle for TracedConnection<C> {
    fn close(&mut self) -> Result<()> {
        let TracedConnection {
            inner,
            info,
            interceptor,
        } = self;
        interceptor.bracket(info, METHOD_CLOSE, || inner.close())
    }

    fn commit(&mut self) -> Result<()> {
        let TracedConnection {
            inner,
            info,
            interceptor,
        } = self;
        interceptor.bracket(info, METHOD_COMMIT, || inner.commit())
    }

    fn rollback(&mut self) -> Result<()> {
        let TracedConnection {
            inner,
            info,
            interceptor,
        } = self;
        interceptor.bracket(info, METHOD_ROLLBACK, || inner.rollback())
    }

    fn release_savepoint(&mut self) -> Result<()> {
        let TracedConnection {
            inner,
            info,
            interceptor,
        } = self;
        interceptor.bracket(info, METHOD_RELEASE_SAVEPOINT, || inner.release_savepoint())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;

    use super::ConnectionLifecycle;
    use super::TracedConnection;
    use crate::carrier::ConnectionInfo;
    use crate::constants::ComponentKind;
    use crate::context::NoopContext;
    use crate::context::SpanSink;
    use crate::context::ThreadLocalContext;
    use crate::context::TraceContext;
    use crate::testkit::MemorySink;
    use crate::testkit::RecordingContext;

    /// Connection double counting calls and failing on demand.
    #[derive(Default)]
    struct FakeConnection {
        closed: u32,
        committed: u32,
        fail_close: bool,
    }

    impl ConnectionLifecycle for FakeConnection {
        fn close(&mut self) -> Result<()> {
            self.closed += 1;
            if self.fail_close {
                anyhow::bail!("connection already closed");
            }
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            self.committed += 1;
            Ok(())
        }

        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }

        fn release_savepoint(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn mysql_carrier() -> ConnectionInfo {
        ConnectionInfo::builder()
            .host("db1")
            .port(3306)
            .database_name("orders")
            .component(ComponentKind::Mysql)
            .db_type("mysql")
            .build()
    }

    #[test]
    fn lifecycle_calls_reach_the_wrapped_connection() {
        let context = Arc::new(RecordingContext::default());
        let mut connection = TracedConnection::with_context(
            FakeConnection::default(),
            mysql_carrier(),
            Arc::clone(&context) as Arc<dyn TraceContext>,
        );

        connection.commit().unwrap();
        connection.rollback().unwrap();
        connection.release_savepoint().unwrap();
        connection.close().unwrap();

        let inner = connection.into_inner();
        assert_eq!(inner.committed, 1);
        assert_eq!(inner.closed, 1);

        let operations: Vec<_> = context
            .finished()
            .iter()
            .map(|span| span.operation_name().to_string())
            .collect();
        assert_eq!(
            operations,
            vec![
                "mysql/JDBI/Connection/commit",
                "mysql/JDBI/Connection/rollback",
                "mysql/JDBI/Connection/releaseSavepoint",
                "mysql/JDBI/Connection/close",
            ]
        );
        assert_eq!(context.depth(), 0);
    }

    #[test]
    fn close_failure_is_traced_and_propagated() {
        let context = Arc::new(RecordingContext::default());
        let inner = FakeConnection {
            fail_close: true,
            ..FakeConnection::default()
        };
        let mut connection =
            TracedConnection::with_context(inner, mysql_carrier(), Arc::clone(&context) as Arc<dyn TraceContext>);

        let error = connection.close().unwrap_err();
        assert_eq!(error.to_string(), "connection already closed");

        let finished = context.finished();
        assert_eq!(finished.len(), 1);
        assert!(finished[0].is_error());
        assert_eq!(finished[0].logs()[0].message, "connection already closed");
        assert!(finished[0].is_finished());
    }

    #[test]
    fn two_connections_trace_independently() {
        let context = Arc::new(RecordingContext::default());
        let postgres = ConnectionInfo::builder()
            .host("db2")
            .port(5432)
            .database_name("billing")
            .component(ComponentKind::Postgresql)
            .db_type("postgresql")
            .build();

        let mut first = TracedConnection::with_context(
            FakeConnection::default(),
            mysql_carrier(),
            Arc::clone(&context) as Arc<dyn TraceContext>,
        );
        let mut second = TracedConnection::with_context(
            FakeConnection::default(),
            postgres,
            Arc::clone(&context) as Arc<dyn TraceContext>,
        );

        first.commit().unwrap();
        second.commit().unwrap();

        let finished = context.finished();
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].operation_name(), "mysql/JDBI/Connection/commit");
        assert_eq!(finished[0].tag_value("db.instance"), Some("orders"));
        assert_eq!(
            finished[1].operation_name(),
            "postgresql/JDBI/Connection/commit"
        );
        assert_eq!(finished[1].tag_value("db.instance"), Some("billing"));
    }

    #[test]
    fn threads_trace_without_cross_contamination() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let sink = Arc::new(MemorySink::default());
        let context: Arc<ThreadLocalContext> =
            Arc::new(ThreadLocalContext::new(logger, Arc::clone(&sink) as Arc<dyn SpanSink>));

        let mut handles = Vec::new();
        for (db_type, database) in [("mysql", "orders"), ("postgresql", "billing")] {
            let context = Arc::clone(&context);
            handles.push(std::thread::spawn(move || {
                let info = ConnectionInfo::builder()
                    .host("db1")
                    .port(4000)
                    .database_name(database)
                    .db_type(db_type)
                    .build();
                let mut connection =
                    TracedConnection::with_context(FakeConnection::default(), info, context);
                connection.commit().unwrap();
                connection.close().unwrap();
            }));
        }
        for handle in handles {
            handle.join().expect("test thread panicked");
        }

        // Each thread produced its own commit/close pair with its own tags.
        let finished = sink.finished();
        assert_eq!(finished.len(), 4);
        for db_type in ["mysql", "postgresql"] {
            let operations: Vec<_> = finished
                .iter()
                .filter(|span| span.operation_name().starts_with(db_type))
                .map(|span| {
                    (
                        span.operation_name().to_string(),
                        span.tag_value("db.instance").unwrap().to_string(),
                    )
                })
                .collect();
            let database = if db_type == "mysql" { "orders" } else { "billing" };
            assert_eq!(
                operations,
                vec![
                    (format!("{}/JDBI/Connection/commit", db_type), database.to_string()),
                    (format!("{}/JDBI/Connection/close", db_type), database.to_string()),
                ]
            );
        }
    }

    // The only test touching the process-wide context: the global is state
    // shared across concurrently running tests.
    #[test]
    fn wrapping_uses_the_installed_context() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let sink = Arc::new(MemorySink::default());
        let context = ThreadLocalContext::new(logger, Arc::clone(&sink) as Arc<dyn SpanSink>);
        crate::context::initialise(Arc::new(context));

        let mut connection = TracedConnection::new(FakeConnection::default(), mysql_carrier());
        connection.commit().unwrap();

        let finished = sink.finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].operation_name(), "mysql/JDBI/Connection/commit");

        // A second initialisation is refused.
        let result = std::panic::catch_unwind(|| {
            crate::context::initialise(Arc::new(NoopContext));
        });
        assert!(result.is_err());
    }
}
