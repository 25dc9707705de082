/// One dispatched `text/event-stream` event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry_ms: Option<u64>,
}

impl SseFrame {
    /// Unnamed events and events named `message` are regular messages.
    pub fn is_message(&self) -> bool {
        self.event
            .as_deref()
            .map_or(true, |name| name.is_empty() || name == "message")
    }
}

/// Most bytes an unterminated frame may occupy, matching the upload ceiling.
pub const MAX_PENDING_BYTES: usize = 16 * 1024 * 1024;

/// Incremental SSE framer. Bytes are buffered raw so multi-byte characters
/// split across network chunks survive.
pub struct SseParser {
    buffer: Vec<u8>,
    max_pending: usize,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::with_max_pending(MAX_PENDING_BYTES)
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_pending,
        }
    }

    /// True once the unterminated tail outgrows the limit; the stream is
    /// no longer producing usable frames.
    pub fn exceeds_limit(&self) -> bool {
        self.buffer.len() > self.max_pending
    }

    pub fn process(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer
            .extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));
        let mut frames = Vec::new();
        let mut start = 0;

        while let Some(end) = find_blank_line(&self.buffer[start..]) {
            let event_end = start + end + 2;
            let event_text = String::from_utf8_lossy(&self.buffer[start..start + end]);

            if let Some(frame) = parse_frame(&event_text) {
                frames.push(frame);
            }

            start = event_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        frames
    }

    pub fn flush(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        rest
    }
}

fn find_blank_line(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|window| window == b"\n\n")
}

fn parse_frame(event_text: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in event_text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => data_lines.push(value),
            "event" => frame.event = Some(value.to_string()),
            "id" => frame.id = Some(value.to_string()),
            "retry" => frame.retry_ms = value.trim().parse().ok(),
            _ => {}
        }
    }

    frame.data = data_lines.join("\n");
    if frame.data.is_empty() {
        return None;
    }

    Some(frame)
}
