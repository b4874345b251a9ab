//! Worker output capture.
//!
//! Each captured stream gets its own reader task. Lines are split on `\n`,
//! decoded with the configured [`OutputEncoding`], written to the log under
//! the `worker` target and forwarded to the router as [`OutputLine`] events.

use crate::notify::NotificationRouter;
use at_protocol::config_models::OutputEncoding;
use at_protocol::event_models::{OutputLine, OutputStream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;

/// Decode one raw line, dropping the trailing line terminator.
pub fn decode_line(raw: &[u8], encoding: OutputEncoding) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

    match encoding {
        OutputEncoding::Utf8 => String::from_utf8_lossy(raw).into_owned(),
        OutputEncoding::Latin1 => raw.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Spawn a task forwarding every line of `reader` until EOF.
pub(crate) fn spawn_reader<R>(
    reader: R,
    stream: OutputStream,
    encoding: OutputEncoding,
    router: NotificationRouter,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = SplitStream::new(BufReader::new(reader).split(b'\n'));

        while let Some(segment) = segments.next().await {
            let raw = match segment {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(
                        target: "worker",
                        ?stream,
                        error = %e,
                        "failed to read worker output"
                    );
                    break;
                }
            };

            let line = decode_line(&raw, encoding);
            match stream {
                OutputStream::Stdout => tracing::info!(target: "worker", "{line}"),
                OutputStream::Stderr => tracing::warn!(target: "worker", "{line}"),
            }
            router.emit(OutputLine::new(stream, line));
        }

        tracing::debug!(?stream, "worker output stream closed");
    })
}
