//! Child stdout/stderr forwarding.
mod assembler;
pub use assembler::LineAssembler;

mod config;
pub use config::LogConfig;

use std::{fmt, sync::Arc};

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives complete lines of child output.
pub trait OutputSink: Send + Sync + 'static {
    fn line(&self, pid: u32, stream: Stream, line: &str);
}

/// Default sink: child output becomes tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    cfg: LogConfig,
}

impl TracingSink {
    pub fn new(cfg: LogConfig) -> Self {
        Self { cfg }
    }
}

impl OutputSink for TracingSink {
    fn line(&self, pid: u32, stream: Stream, line: &str) {
        match stream {
            Stream::Stdout if self.cfg.stdout_info => info!(pid, stream = "stdout", "{line}"),
            Stream::Stderr if self.cfg.stderr_warn => warn!(pid, stream = "stderr", "{line}"),
            _ => debug!(pid, stream = stream.as_str(), "{line}"),
        }
    }
}

/// Copy `reader` into `sink` line by line until EOF or a read error.
///
/// The trailing partial line is always delivered before returning.
pub(crate) async fn forward<R>(mut reader: R, pid: u32, stream: Stream, sink: Arc<dyn OutputSink>, max_line: usize)
where
    R: AsyncRead + Unpin,
{
    let mut asm = LineAssembler::new(max_line);
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => asm.push(&chunk[..n], |l| sink.line(pid, stream, l)),
            Err(e) => {
                debug!(pid, stream = stream.as_str(), error = %e, "output stream read failed");
                break;
            }
        }
    }
    asm.finish(|l| sink.line(pid, stream, l));
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::Collect;
    use super::*;

    #[tokio::test]
    async fn forwards_lines_and_trailing_partial() {
        let sink = Arc::new(Collect::default());
        let input: &[u8] = b"one\ntwo\nthree";

        forward(input, 1, Stream::Stdout, sink.clone(), 4096).await;

        assert_eq!(sink.of(Stream::Stdout), ["one", "two", "three"]);
    }
}
