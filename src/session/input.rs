//! Line-based player input
//!
//! Each line is one press. A line of the form `p <id>` (or
//! `pointer <id>`) presses the pointer on challenge `<id>`; any other
//! line, including an empty one, is a key press.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::challenge::{ChallengeId, InputEvent};

/// Parses one input line.
///
/// Returns `None` for a pointer line whose id is not a number.
#[must_use]
pub fn parse_input_line(line: &str) -> Option<InputEvent> {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("p" | "pointer") => {
            let id = words.next()?.parse().ok()?;
            Some(InputEvent::Pointer(ChallengeId(id)))
        }
        _ => Some(InputEvent::Key),
    }
}

/// Spawns a task forwarding parsed lines from `reader` into `tx`.
///
/// The task ends at EOF, on a read error, or when the receiver is dropped.
pub fn spawn_reader<R>(reader: R, tx: mpsc::Sender<InputEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(event) = parse_input_line(&line) else {
                        warn!(line = %line.trim(), "ignoring malformed input");
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    break;
                }
            }
        }
    })
}
