//! stdio host.
//!
//! One logical client, one sequential loop: a frame is fully dispatched,
//! including any tool work, and its response written before the next frame
//! is read. A bad frame or failed call produces an error response and the
//! loop moves on. The loop ends on EOF or on the shutdown future.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};

use crate::config::TransportMode;
use crate::mcp::{CallContext, Dispatcher, LineTransport};

/// The dispatcher bound to a line transport.
pub struct StdioHost<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    dispatcher: Arc<Dispatcher>,
    transport: LineTransport<R, W>,
}

impl<R, W> std::fmt::Debug for StdioHost<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioHost").finish_non_exhaustive()
    }
}

impl StdioHost {
    /// Creates a host on the process's standard streams.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_transport(dispatcher, LineTransport::stdio())
    }
}

impl<R, W> StdioHost<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a host on an arbitrary line transport.
    pub const fn with_transport(dispatcher: Arc<Dispatcher>, transport: LineTransport<R, W>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    /// Runs the read/dispatch loop until EOF or `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing the transport fails.
    pub async fn run_until<F>(mut self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let ctx = CallContext::new(TransportMode::Stdio);
        tracing::info!("Serving on stdio");

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    let Some(line) = line? else {
                        tracing::info!("stdin closed, shutting down");
                        return Ok(());
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    if let Some(response) = self.dispatcher.dispatch(&line, &ctx).await {
                        self.transport.write_response(&response).await?;
                    }
                }
            }
        }
    }
}
