use std::io::{self, Write};

use axum::body::Body;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::document;
use crate::submission::{RequestId, Submission};

const CHUNK_SIZE: usize = 16 * 1024;
const CHANNEL_DEPTH: usize = 4;

/// Buffers writes into chunks handed to the response body. Runs on a
/// blocking thread.
struct ChunkWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buffer: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buffer: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(CHUNK_SIZE),
        ));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() >= CHUNK_SIZE {
            self.send_buffer()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffer()
    }
}

/// Streams a freshly rendered summary. Rendering failures are logged and
/// end the body early; the stream is always closed.
pub fn document_body(
    request_id: RequestId,
    submission: Submission,
    rendered_at: DateTime<Utc>,
) -> Body {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    tokio::task::spawn_blocking(move || {
        let writer = ChunkWriter::new(tx);
        if let Err(err) = document::render(&submission, rendered_at, writer) {
            tracing::error!(request_id = %request_id, error = %err, "failed to stream summary");
        }
    });
    Body::from_stream(ReceiverStream::new(rx))
}
