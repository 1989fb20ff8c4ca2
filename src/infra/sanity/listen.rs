//! Decoding of the listener's `text/event-stream` body into [`ListenEvent`]s.

use crate::domain::source::ListenEvent;
use crate::error::FetchError;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value as JsonValue;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental SSE parser. Chunks may split lines (and UTF-8 sequences)
/// anywhere, so raw bytes are buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    current: SseFrame,
    has_data: bool,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.feed_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            let frame = std::mem::take(&mut self.current);
            let has_data = std::mem::take(&mut self.has_data);
            return (has_data || frame.event.is_some()).then_some(frame);
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.current.event = Some(value.to_string()),
            "data" => {
                if self.has_data {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
                self.has_data = true;
            }
            "id" => self.current.id = Some(value.to_string()),
            _ => {}
        }
        None
    }
}

fn str_field(data: &JsonValue, key: &str) -> Option<String> {
    data.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

/// Maps a frame to a listener event. Unknown event names are dropped.
pub fn frame_to_event(frame: &SseFrame) -> Option<ListenEvent> {
    let data: JsonValue = serde_json::from_str(&frame.data).unwrap_or(JsonValue::Null);
    let event = match frame.event.as_deref()? {
        "welcome" => ListenEvent::Welcome {
            listener_name: str_field(&data, "listenerName"),
        },
        "mutation" => ListenEvent::Mutation {
            document_id: str_field(&data, "documentId"),
            transition: str_field(&data, "transition"),
        },
        "reconnect" => ListenEvent::Reconnect,
        "channelError" => ListenEvent::ChannelError {
            message: str_field(&data, "message").unwrap_or_else(|| frame.data.clone()),
        },
        "disconnect" => ListenEvent::Disconnect {
            reason: str_field(&data, "reason").unwrap_or_else(|| frame.data.clone()),
        },
        other => {
            tracing::trace!(event_name = other, "ignoring unknown listener event");
            return None;
        }
    };
    Some(event)
}

/// Turns a raw body stream into listener events.
pub fn events<S, B>(body: S) -> impl Stream<Item = Result<ListenEvent, FetchError>> + Send + 'static
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + 'static,
{
    let mut decoder = SseDecoder::default();
    body.map(move |chunk| match chunk {
        Ok(bytes) => decoder
            .push(bytes.as_ref())
            .iter()
            .filter_map(frame_to_event)
            .map(Ok)
            .collect::<Vec<_>>(),
        Err(e) => vec![Err(FetchError::Transport(e))],
    })
    .flat_map(stream::iter)
}
