// Bounded output capture

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8192;

/// Bytes kept from one stream plus a count of what was dropped
#[derive(Debug, Default)]
pub struct Captured {
    pub bytes: Vec<u8>,
    pub omitted: usize,
}

impl Captured {
    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }

    /// Lossy UTF-8 text, with a marker when bytes were dropped
    pub fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.omitted > 0 {
            text.push_str(&format!("\n[truncated: {} bytes omitted]", self.omitted));
        }
        text
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes
///
/// Keeps draining past the cap so the child never blocks on a full pipe.
pub async fn read_capped<R>(mut reader: R, cap: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(captured.bytes.len());
        let keep = room.min(n);
        captured.bytes.extend_from_slice(&chunk[..keep]);
        captured.omitted += n - keep;
    }

    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_under_cap() {
        let captured = read_capped(&b"hello"[..], 16).await.unwrap();
        assert!(!captured.is_truncated());
        assert_eq!(captured.into_text(), "hello");
    }

    #[tokio::test]
    async fn test_over_cap_truncates_with_marker() {
        let data = vec![b'x'; 20_000];
        let captured = read_capped(&data[..], 100).await.unwrap();
        assert_eq!(captured.bytes.len(), 100);
        assert_eq!(captured.omitted, 19_900);
        let text = captured.into_text();
        assert!(text.ends_with("[truncated: 19900 bytes omitted]"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_lossy() {
        let captured = read_capped(&[0x66, 0xff, 0x6f][..], 16).await.unwrap();
        assert_eq!(captured.into_text(), "f\u{fffd}o");
    }
}
