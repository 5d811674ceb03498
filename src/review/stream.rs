//! Newline-delimited JSON progress events.

use std::io::Write;

use serde::Serialize;

use crate::domain::Finding;

/// One line of streaming output
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent<'a> {
    Progress { msg: String },
    Finding { data: &'a Finding },
    Done,
}

/// Best-effort writer for [`StreamEvent`]s; write failures are logged and
/// otherwise ignored.
pub struct EventSink<'w> {
    writer: &'w mut (dyn Write + Send),
}

impl<'w> EventSink<'w> {
    pub fn new(writer: &'w mut (dyn Write + Send)) -> Self {
        Self { writer }
    }

    pub fn emit(&mut self, event: &StreamEvent<'_>) {
        let result = serde_json::to_string(event)
            .map_err(std::io::Error::from)
            .and_then(|line| {
                self.writer.write_all(line.as_bytes())?;
                self.writer.write_all(b"\n")?;
                self.writer.flush()
            });
        if let Err(e) = result {
            tracing::debug!("Dropped stream event: {}", e);
        }
    }

    pub fn progress(&mut self, msg: impl Into<String>) {
        self.emit(&StreamEvent::Progress { msg: msg.into() });
    }
}

/// Emit on an optional sink.
pub(super) fn emit(sink: &mut Option<&mut EventSink<'_>>, event: StreamEvent<'_>) {
    if let Some(sink) = sink.as_deref_mut() {
        sink.emit(&event);
    }
}
