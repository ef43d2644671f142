//! Server-sent events
//!
//! Line-oriented reader for `text/event-stream` bodies plus the iterator that
//! turns decoded events into [`StreamChunk`]s. Each vendor adapter supplies
//! only the per-event decoding.

use std::io::{self, BufRead};

use crate::capability::{ProviderError, StreamChunk};

/// One dispatched event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Reads events from a buffered body, one blank-line-terminated block at a time
pub struct SseReader<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for SseReader<R> {
    type Item = io::Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut event = None;
        let mut data: Vec<String> = Vec::new();

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Err(e) => return Some(Err(e)),
                Ok(0) => {
                    if event.is_none() && data.is_empty() {
                        return None;
                    }
                    return Some(Ok(SseEvent {
                        event,
                        data: data.join("\n"),
                    }));
                }
                Ok(_) => {}
            }

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if event.is_none() && data.is_empty() {
                    continue;
                }
                return Some(Ok(SseEvent {
                    event,
                    data: data.join("\n"),
                }));
            }

            // comment / keep-alive
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value.to_string()),
                _ => {}
            }
        }
    }
}

/// What a vendor decoder made of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// Event carries no text (role headers, pings, usage blocks)
    Skip,
    /// Vendor-specific end-of-stream marker
    Done,
}

/// Adapts an [`SseReader`] into the chunk sequence expected by the pipeline.
///
/// Ends with a `done` chunk on the vendor end marker or at end of body. After
/// the first error the iterator is exhausted.
pub struct SseChunks<R, F> {
    events: SseReader<R>,
    decode: F,
    finished: bool,
}

impl<R, F> SseChunks<R, F>
where
    R: BufRead,
    F: FnMut(&SseEvent) -> Result<Frame, ProviderError>,
{
    pub fn new(reader: R, decode: F) -> Self {
        Self {
            events: SseReader::new(reader),
            decode,
            finished: false,
        }
    }
}

impl<R, F> Iterator for SseChunks<R, F>
where
    R: BufRead,
    F: FnMut(&SseEvent) -> Result<Frame, ProviderError>,
{
    type Item = Result<StreamChunk, ProviderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let event = match self.events.next() {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.finished = true;
                    return Some(Ok(StreamChunk::done()));
                }
            };

            match (self.decode)(&event) {
                Ok(Frame::Text(text)) if !text.is_empty() => {
                    return Some(Ok(StreamChunk::text(text)));
                }
                Ok(Frame::Text(_)) | Ok(Frame::Skip) => continue,
                Ok(Frame::Done) => {
                    self.finished = true;
                    return Some(Ok(StreamChunk::done()));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn events(body: &str) -> Vec<SseEvent> {
        SseReader::new(Cursor::new(body.to_string()))
            .map(|e| e.unwrap())
            .collect()
    }

    #[test]
    fn test_reader_splits_on_blank_lines() {
        let body = "event: ping\ndata: {}\n\n: keep-alive\n\ndata: a\ndata: b\r\n\r\n";
        let parsed = events(body);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].event.as_deref(), Some("ping"));
        assert_eq!(parsed[0].data, "{}");
        assert_eq!(parsed[1].event, None);
        assert_eq!(parsed[1].data, "a\nb");
    }

    #[test]
    fn test_reader_flushes_unterminated_event() {
        let parsed = events("data: tail");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].data, "tail");
    }

    #[test]
    fn test_chunks_stop_at_done_marker() {
        let body = "data: Hel\n\ndata: \n\ndata: lo\n\ndata: [DONE]\n\ndata: ignored\n\n";
        let chunks: Vec<StreamChunk> = SseChunks::new(Cursor::new(body), |e: &SseEvent| {
            Ok(if e.data == "[DONE]" {
                Frame::Done
            } else {
                Frame::Text(e.data.clone())
            })
        })
        .map(|c| c.unwrap())
        .collect();

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("Hel"),
                StreamChunk::text("lo"),
                StreamChunk::done()
            ]
        );
    }

    #[test]
    fn test_chunks_end_after_error() {
        let body = "data: ok\n\ndata: bad\n\ndata: never\n\n";
        let mut chunks = SseChunks::new(Cursor::new(body), |e: &SseEvent| {
            if e.data == "bad" {
                Err(ProviderError::Stream {
                    provider: "test",
                    message: "boom".to_string(),
                })
            } else {
                Ok(Frame::Text(e.data.clone()))
            }
        });

        assert_eq!(chunks.next().unwrap().unwrap(), StreamChunk::text("ok"));
        assert!(chunks.next().unwrap().is_err());
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_end_of_body_emits_done() {
        let mut chunks = SseChunks::new(Cursor::new(""), |_: &SseEvent| Ok(Frame::Skip));
        assert_eq!(chunks.next().unwrap().unwrap(), StreamChunk::done());
        assert!(chunks.next().is_none());
    }
}
