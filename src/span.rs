//! In-memory model of exit spans produced by the hook.
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::constants::ComponentKind;

/// Architectural layer a span is classified under.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum SpanLayer {
    Database,
}

/// A single tag attached to a span.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// A timestamped event recorded on a span.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SpanLog {
    pub timestamp_micros: u64,
    pub event: String,
    pub message: String,
}

/// A timed, tagged record of one exit operation.
///
/// Spans are created by the tracing context, mutated by the interceptor while
/// they sit on the active-span stack, and handed to the embedder's sink once
/// stopped. Serialisable so embedders can export them as they see fit.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Span {
    operation_name: String,
    remote_peer: String,
    tags: Vec<Tag>,
    component: Option<ComponentKind>,
    layer: Option<SpanLayer>,
    is_error: bool,
    logs: Vec<SpanLog>,
    start_time_micros: u64,
    end_time_micros: Option<u64>,
}

impl Span {
    /// Open a new span for the given operation and remote peer.
    pub fn new<S1, S2>(operation_name: S1, remote_peer: S2) -> Span
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Span {
            operation_name: operation_name.into(),
            remote_peer: remote_peer.into(),
            tags: Vec::new(),
            component: None,
            layer: None,
            is_error: false,
            logs: Vec::new(),
            start_time_micros: unix_micros(),
            end_time_micros: None,
        }
    }

    /// Attach a tag to the span, replacing any previous value for the key.
    pub fn tag<S: Into<String>>(&mut self, key: &str, value: S) -> &mut Span {
        let value = value.into();
        match self.tags.iter_mut().find(|tag| tag.key == key) {
            Some(tag) => tag.value = value,
            None => self.tags.push(Tag {
                key: key.to_string(),
                value,
            }),
        }
        self
    }

    /// Record the database component the span's call targets.
    pub fn set_component(&mut self, component: ComponentKind) -> &mut Span {
        self.component = Some(component);
        self
    }

    /// Classify the span under an architectural layer.
    pub fn set_layer(&mut self, layer: SpanLayer) -> &mut Span {
        self.layer = Some(layer);
        self
    }

    /// Mark the span's operation as failed.
    pub fn error_occurred(&mut self) -> &mut Span {
        self.is_error = true;
        self
    }

    /// Record an error event with the given detail message.
    pub fn log_error<S: Into<String>>(&mut self, message: S) -> &mut Span {
        self.logs.push(SpanLog {
            timestamp_micros: unix_micros(),
            event: "error".to_string(),
            message: message.into(),
        });
        self
    }

    /// Close the span, fixing its end timestamp.
    pub fn finish(&mut self) {
        self.end_time_micros = Some(unix_micros());
    }

    /// Operation name the span was opened with.
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Remote peer the span's call is directed at.
    pub fn remote_peer(&self) -> &str {
        &self.remote_peer
    }

    /// All tags attached to the span, in attach order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Value of a tag by key, if attached.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.value.as_str())
    }

    /// Database component recorded on the span, if any.
    pub fn component(&self) -> Option<ComponentKind> {
        self.component
    }

    /// Layer the span is classified under, if any.
    pub fn layer(&self) -> Option<SpanLayer> {
        self.layer
    }

    /// True if the span's operation was marked as failed.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Events recorded on the span.
    pub fn logs(&self) -> &[SpanLog] {
        &self.logs
    }

    /// True once the span was closed.
    pub fn is_finished(&self) -> bool {
        self.end_time_micros.is_some()
    }
}

/// Microseconds since the unix epoch, clamped to zero for clocks set before it.
fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or(0)
}
