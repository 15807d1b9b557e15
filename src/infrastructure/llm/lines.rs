//! Splits a streamed HTTP body into complete text lines

use futures::{Stream, StreamExt};

use super::http_client::ByteStream;
use crate::domain::DomainError;

/// Re-chunks `bytes` on `\n`, yielding trimmed non-empty lines.
///
/// Network chunks may end mid-line or mid-character; bytes are buffered
/// until a full line arrives and only complete lines are decoded. The tail
/// is flushed when the body ends.
pub fn lines(bytes: ByteStream) -> impl Stream<Item = Result<String, DomainError>> + Send {
    futures::stream::unfold(
        (bytes, Vec::<u8>::new(), false),
        |(mut bytes, mut buffer, mut finished)| async move {
            loop {
                if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let raw: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = decode(&raw[..pos]);
                    if line.is_empty() {
                        continue;
                    }
                    return Some((Ok(line), (bytes, buffer, finished)));
                }

                if finished {
                    let tail = decode(&buffer);
                    if tail.is_empty() {
                        return None;
                    }
                    return Some((Ok(tail), (bytes, Vec::new(), true)));
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(e), (bytes, buffer, true))),
                    None => finished = true,
                }
            }
        },
    )
}

fn decode(line: &[u8]) -> String {
    String::from_utf8_lossy(line).trim().to_string()
}
