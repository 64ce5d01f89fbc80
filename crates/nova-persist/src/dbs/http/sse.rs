use futures::StreamExt;
use nova_types::ChangeEvent;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

use crate::trait_client::ChangeStream;

/// Byte buffer that hands out complete lines
pub(crate) struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next line without its terminator, or None until a `\n` arrives
    pub(crate) fn next_line(&mut self) -> Option<Result<String, std::str::Utf8Error>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        Some(std::str::from_utf8(&line_bytes).map(|line| line.trim_end_matches(|c| c == '\r' || c == '\n').to_string()))
    }
}

/// Accumulates `event:` / `data:` fields until the blank line ending a frame
#[derive(Debug, Default)]
pub(crate) struct SseFrame {
    event: Option<String>,
    data: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct CompletedFrame {
    pub event: String,
    pub data: String,
}

impl SseFrame {
    pub(crate) fn push_line(&mut self, line: &str) -> Option<CompletedFrame> {
        if line.is_empty() {
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            let frame = CompletedFrame {
                event: self.event.take().unwrap_or_else(|| "message".to_string()),
                data: std::mem::take(&mut self.data).join("\n"),
            };
            return Some(frame);
        }

        // Comment lines are keep-alives
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }
}

/// Turn an SSE response of `change` frames into a change stream.
/// The stream ends when the connection drops; there is no reconnect.
pub(crate) fn change_stream<T>(response: reqwest::Response) -> ChangeStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let bytes = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(bytes);
        let mut buffer = LineBuffer::with_capacity(4096);
        let mut frame = SseFrame::default();

        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("Change feed connection dropped: {}", e);
                    break;
                }
            };
            buffer.extend(&chunk);

            while let Some(line) = buffer.next_line() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("Skipping non UTF-8 feed line: {}", e);
                        continue;
                    }
                };
                let Some(completed) = frame.push_line(&line) else {
                    continue;
                };
                if completed.event != "change" {
                    continue;
                }
                match serde_json::from_str::<ChangeEvent<T>>(&completed.data) {
                    Ok(event) => yield event,
                    Err(e) => tracing::warn!("Malformed change event: {}", e),
                }
            }
        }
    })
}
