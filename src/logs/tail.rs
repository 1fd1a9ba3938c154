//! Reading the end of a log file without loading all of it.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const CHUNK_SIZE: u64 = 8 * 1024;

/// Returns the last `n` lines of the file at `path`.
///
/// The file is read backwards in fixed-size chunks until enough newlines are
/// seen, so only the tail is held in memory. Invalid UTF-8 becomes U+FFFD and
/// trailing whitespace is trimmed from every line.
pub fn read_tail_lines(path: &Path, n: usize) -> io::Result<Vec<String>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Vec::new());
    }

    let mut pos = len;
    let mut buf: Vec<u8> = Vec::new();
    let mut newlines = 0usize;

    // One extra newline is needed when the file ends with '\n'.
    while pos > 0 && newlines <= n {
        let read_len = CHUNK_SIZE.min(pos);
        pos -= read_len;
        file.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; read_len as usize];
        file.read_exact(&mut chunk)?;
        newlines += chunk.iter().filter(|b| **b == b'\n').count();

        chunk.extend_from_slice(&buf);
        buf = chunk;
    }

    Ok(last_lines(&buf, n))
}

/// Splits `bytes` into lines and keeps the last `n`.
pub(crate) fn last_lines(bytes: &[u8], n: usize) -> Vec<String> {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if bytes.is_empty() || n == 0 {
        return Vec::new();
    }

    let lines: Vec<&[u8]> = bytes.split(|b| *b == b'\n').collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..]
        .iter()
        .map(|line| String::from_utf8_lossy(line).trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_tail_of_small_file() {
        let file = write_temp(b"one\ntwo\nthree\n");
        let lines = read_tail_lines(file.path(), 2).unwrap();
        assert_eq!(lines, vec!["two", "three"]);
    }

    #[test]
    fn test_tail_without_trailing_newline() {
        let file = write_temp(b"one\ntwo\nthree");
        let lines = read_tail_lines(file.path(), 5).unwrap();
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_tail_spanning_chunks() {
        let mut content = String::new();
        for i in 0..5000 {
            content.push_str(&format!("line number {}\n", i));
        }
        let file = write_temp(content.as_bytes());

        let lines = read_tail_lines(file.path(), 3).unwrap();
        assert_eq!(
            lines,
            vec!["line number 4997", "line number 4998", "line number 4999"]
        );

        let lines = read_tail_lines(file.path(), 2000).unwrap();
        assert_eq!(lines.len(), 2000);
        assert_eq!(lines[0], "line number 3000");
    }

    #[test]
    fn test_tail_empty_and_zero() {
        let empty = write_temp(b"");
        assert!(read_tail_lines(empty.path(), 10).unwrap().is_empty());

        let file = write_temp(b"a\nb\n");
        assert!(read_tail_lines(file.path(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let file = write_temp(b"ok\nbad \xff\xfe byte  \n");
        let lines = read_tail_lines(file.path(), 1).unwrap();
        assert_eq!(lines, vec!["bad \u{FFFD}\u{FFFD} byte"]);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        assert_eq!(last_lines(b"a\n\nb\n", 3), vec!["a", "", "b"]);
    }
}
