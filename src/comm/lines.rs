// Bounded line reading
//
// A line longer than the limit is drained and reported by length, never
// buffered whole.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, PartialEq)]
pub enum Line {
    /// A complete line without its terminator
    Text(String),
    /// A line over the limit; holds its length in bytes
    TooLong(usize),
    Eof,
}

/// Read one `\n`-terminated line of at most `max_bytes` bytes
///
/// A trailing `\r` is dropped. Invalid UTF-8 is replaced, so the decoder
/// reports it as a parse error rather than the reader failing.
pub async fn read_line_bounded<R>(reader: &mut R, buf: &mut Vec<u8>, max_bytes: usize) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut total = 0usize;
    let mut overflow = false;

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            if total == 0 {
                return Ok(Line::Eof);
            }
            break;
        }

        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let content = if done { &available[..used - 1] } else { &available[..used] };
        total += content.len();
        if !overflow {
            if buf.len() + content.len() > max_bytes {
                overflow = true;
                buf.clear();
            } else {
                buf.extend_from_slice(content);
            }
        }
        reader.consume(used);

        if done {
            break;
        }
    }

    if overflow {
        return Ok(Line::TooLong(total));
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(Line::Text(String::from_utf8_lossy(buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8], max: usize) -> Vec<Line> {
        let mut reader = BufReader::with_capacity(4, input);
        let mut buf = Vec::new();
        let mut out = Vec::new();
        loop {
            let line = read_line_bounded(&mut reader, &mut buf, max).await.unwrap();
            if line == Line::Eof {
                break;
            }
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn test_splits_lines() {
        let lines = read_all(b"{\"a\":1}\r\n\n{\"b\":2}", 64).await;
        assert_eq!(
            lines,
            vec![
                Line::Text("{\"a\":1}".to_string()),
                Line::Text(String::new()),
                Line::Text("{\"b\":2}".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_overlong_line_is_drained() {
        let input = format!("{}\nok\n", "x".repeat(40));
        let lines = read_all(input.as_bytes(), 16).await;
        assert_eq!(lines, vec![Line::TooLong(40), Line::Text("ok".to_string())]);
    }
}
