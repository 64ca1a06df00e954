//! Line-delimited transport.
//!
//! The stdio host speaks newline-delimited JSON-RPC:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! [`LineTransport`] is generic over any buffered reader and writer so the
//! same framing is exercised in tests with in-memory pipes.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::Response;

/// A newline-framed message channel.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport bound to the process's standard streams.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport over stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over an arbitrary reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` on EOF. Bytes that are not valid UTF-8 are replaced
    /// with U+FFFD, so a corrupt line reaches the dispatcher as a frame that
    /// fails to parse instead of failing the read.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Writes one response followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub async fn write_response(&mut self, response: &Response) -> io::Result<()> {
        self.write_raw(&response.to_json()).await
    }

    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcResponse, RequestId};

    #[tokio::test]
    async fn reads_lines_and_strips_terminators() {
        let input: &[u8] = b"first\r\nsecond\nthird";
        let mut transport = LineTransport::new(input, Vec::new());

        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let input: &[u8] = b"\xff\xfe bad\nnext\n";
        let mut transport = LineTransport::new(input, Vec::new());

        let line = transport.read_line().await.unwrap().unwrap();
        assert_eq!(line, "\u{FFFD}\u{FFFD} bad");
        assert_eq!(transport.read_line().await.unwrap().as_deref(), Some("next"));
        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn writes_one_line_per_response() {
        let mut transport = LineTransport::new(&b""[..], Vec::new());
        let response = Response::Success(JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({"message": "hello\nworld", "nested": {"key": "value"}}),
        ));

        transport.write_response(&response).await.unwrap();
        transport.write_response(&response).await.unwrap();

        let written = String::from_utf8(transport.writer).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.ends_with('\n'));
    }

    #[tokio::test]
    async fn frames_exactly_on_the_wire() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":7,")
            .read(b"\"method\":\"ping\"}\n")
            .build();
        let writer = tokio_test::io::Builder::new()
            .write(br#"{"jsonrpc":"2.0","id":7,"result":{}}"#)
            .write(b"\n")
            .build();
        let mut transport = LineTransport::new(BufReader::new(reader), writer);

        let line = transport.read_line().await.unwrap().unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#);

        let response = Response::Success(JsonRpcResponse::success(
            RequestId::Number(7),
            serde_json::json!({}),
        ));
        transport.write_response(&response).await.unwrap();
    }
}
