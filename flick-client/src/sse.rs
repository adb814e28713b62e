//! Incremental Server-Sent Events decoder
//!
//! Reassembles `text/event-stream` frames from arbitrary byte chunks.
//! Only `data:` fields matter to this client; comments (keep-alives)
//! and `event:`/`id:`/`retry:` fields are skipped.

/// Streaming SSE frame decoder
///
/// Feed raw chunks as they arrive; completed frames come back as their
/// joined data payloads. Partial frames stay buffered across calls.
#[derive(Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning the data payload of every frame it
    /// completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        // Normalize CRLF so frame boundaries are always "\n\n". A pair
        // split across chunks is caught on the next push.
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut payloads = Vec::new();
        // A blank line terminates a frame
        while let Some(boundary) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..boundary + 2).collect();
            if let Some(payload) = decode_frame(&frame) {
                payloads.push(payload);
            }
        }
        payloads
    }
}

/// Extract the joined `data:` payload from one complete frame.
///
/// Frames with no data lines (comment-only keep-alives) yield `None`.
fn decode_frame(frame: &str) -> Option<String> {
    let mut data_lines = Vec::new();

    for line in frame.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
        // event:/id:/retry: fields are irrelevant here
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
