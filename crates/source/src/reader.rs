use crate::LogSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Reads one line without its `\n` or `\r\n` terminator. Invalid UTF-8 is
/// replaced with U+FFFD.
pub(crate) async fn read_line_lossy<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Log lines from any buffered reader: stdin, a captured log file, a pipe.
pub struct ReaderSource<R> {
    name: &'static str,
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin + Send> ReaderSource<R> {
    pub fn new(name: &'static str, reader: R) -> Self {
        Self {
            name,
            reader,
            buf: Vec::new(),
        }
    }
}

impl ReaderSource<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl ReaderSource<BufReader<tokio::fs::File>> {
    pub async fn open(path: &str) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open log file {path}"))?;
        Ok(Self::new("file", BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LogSource for ReaderSource<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(read_line_lossy(&mut self.reader, &mut self.buf).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::ReaderSource;
    use crate::LogSource;
    use std::io::Write;

    #[tokio::test]
    async fn reads_lines_in_order() {
        let data: &[u8] = b"first\nsecond\r\nthird";
        let mut source = ReaderSource::new("memory", data);
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("third"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_stream() {
        let data: &[u8] =
            b"x \xff\xfe\n{\"title\":\"Song\",\"artist\":\"A\",\"position\":0,\"state\":true}\n";
        let mut source = ReaderSource::new("memory", data);

        let garbled = source.next_line().await.unwrap().unwrap();
        assert!(garbled.starts_with("x "));
        assert!(garbled.contains('\u{FFFD}'));

        let report = source.next_line().await.unwrap().unwrap();
        let state = crate::ingest_line(&report).unwrap().unwrap();
        assert_eq!(state.title, "Song");
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn opens_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"I USB_MUSIC: {{"title":"t"}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let mut source = ReaderSource::open(&path).await.unwrap();
        assert_eq!(source.name(), "file");
        assert!(source.next_line().await.unwrap().unwrap().contains("USB_MUSIC"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }
}
