//! Line-buffered capture of guest output streams.

/// Collects the lines a guest program writes to one stream.
#[derive(Debug, Clone, Default)]
pub struct StreamCapture {
    lines: Vec<String>,
}

impl StreamCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line of output.
    pub fn write_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Discard everything captured so far.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Everything captured so far, newline-joined.
    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_joins_lines() {
        let mut capture = StreamCapture::new();
        capture.write_line("first");
        capture.write_line("second");
        assert_eq!(capture.contents(), "first\nsecond");
    }

    #[test]
    fn test_empty_capture_has_empty_contents() {
        let capture = StreamCapture::new();
        assert!(capture.is_empty());
        assert_eq!(capture.contents(), "");
    }

    #[test]
    fn test_clear_resets_capture() {
        let mut capture = StreamCapture::new();
        capture.write_line("stale");
        capture.clear();
        assert!(capture.is_empty());
        assert_eq!(capture.contents(), "");
    }
}
