use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;

use super::LogEventDetector;

/// Log sink shared by the stdout and stderr readers of one instance.
///
/// Closed when the last reader finishes.
pub type SharedLogSink<W> = Arc<Mutex<W>>;

/// Copy `reader` into `sink` line by line and feed each line to `detector`.
///
/// Runs until end-of-stream, which happens when the process exits. Returns the
/// number of lines seen.
pub async fn consume_stream<R, W>(
    reader: R,
    sink: SharedLogSink<W>,
    detector: LogEventDetector,
    stream_name: &'static str,
) -> usize
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(1024);
    let mut lines = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                lines += 1;
                {
                    let mut sink = sink.lock().await;
                    if let Err(e) = sink.write_all(&buf).await {
                        error!("failed to persist {} line: {:?}", stream_name, e);
                    }
                }

                let text = String::from_utf8_lossy(&buf);
                detector.on_line(text.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                error!("failed to read {}: {:?}", stream_name, e);
                break;
            }
        }
    }

    if let Err(e) = sink.lock().await.flush().await {
        error!("failed to flush {} sink: {:?}", stream_name, e);
    }
    debug!("{} closed after {} lines", stream_name, lines);
    lines
}
