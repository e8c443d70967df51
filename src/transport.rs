//! Unix-socket transport. The scheduler is the connecting side: the event
//! producer listens, we dial in, and both directions carry one JSON object
//! per newline-terminated line.

use std::path::Path;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;

use crate::error::WireError;

/// Upper bound on a single inbound frame.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct Transport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl Transport {
    pub async fn connect(path: &Path) -> Result<Self, WireError> {
        let stream = UnixStream::connect(path).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
            line: String::new(),
        })
    }

    /// Next raw frame, without its trailing newline. `Ok(None)` on clean EOF.
    pub async fn recv_line(&mut self) -> Result<Option<&str>, WireError> {
        self.line.clear();
        let n = self.reader.read_line(&mut self.line).await?;
        if n == 0 {
            return Ok(None);
        }
        if n > MAX_FRAME_BYTES {
            return Err(WireError::FrameTooLarge(n));
        }
        Ok(Some(self.line.trim()))
    }

    /// Serialize `value` and send it as one line.
    pub async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), WireError> {
        let mut frame = serde_json::to_vec(value)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;
        Ok(())
    }
}
