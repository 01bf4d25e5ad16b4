//! `Content-Length` framing for JSON-RPC over the server's stdio.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Largest accepted body. Object trees of big codebases run to several MiB.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Value of a `Content-Length` header line, `None` for any other header.
fn content_length(line: &str) -> Result<Option<usize>> {
    let Some((key, value)) = line.split_once(':') else {
        return Ok(None);
    };
    if !key.trim().eq_ignore_ascii_case("Content-Length") {
        return Ok(None);
    }
    let len = value
        .trim()
        .parse()
        .with_context(|| format!("invalid Content-Length '{}'", value.trim()))?;
    Ok(Some(len))
}

pub struct FrameReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next message, or `None` when the stream ends between frames.
    pub async fn read_frame(&mut self) -> Result<Option<serde_json::Value>> {
        let Some(len) = self.read_header().await? else {
            return Ok(None);
        };
        if len > MAX_FRAME_BYTES {
            bail!("frame of {len} bytes exceeds {MAX_FRAME_BYTES}");
        }

        let mut body = vec![0u8; len];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading frame body")?;
        serde_json::from_slice(&body)
            .map(Some)
            .context("parsing JSON-RPC frame")
    }

    async fn read_header(&mut self) -> Result<Option<usize>> {
        let mut len = None;
        let mut started = false;
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("reading header")?;
            if read == 0 {
                if started {
                    bail!("stream ended inside a frame header");
                }
                return Ok(None);
            }
            started = true;

            let line = self.line.trim();
            if line.is_empty() {
                return len
                    .map(Some)
                    .context("frame header has no Content-Length");
            }
            if let Some(value) = content_length(line)? {
                len = Some(value);
            }
        }
    }
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_frame<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing JSON-RPC frame")?;
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(&body);
        self.writer
            .write_all(&frame)
            .await
            .context("writing frame")?;
        self.writer.flush().await.context("flushing frame")
    }
}
