//! Buffered input lines for guest reads.
//!
//! The host supplies the complete input text at the start of every run;
//! the guest's blocking read pops one line at a time. When the buffer
//! runs dry mid-program, the interpreter raises the input-requested
//! signal and the run pauses (see `engine`).

use std::collections::VecDeque;

/// FIFO queue of input lines.
#[derive(Debug, Clone, Default)]
pub struct InputChannel {
    lines: VecDeque<String>,
}

impl InputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffered lines with the lines of `stdin`.
    ///
    /// CRLF sequences are normalized to newlines, and a single trailing
    /// newline does not produce an empty final line: `"a\nb\n"` and
    /// `"a\nb"` both load `["a", "b"]`. `None` clears the channel.
    pub fn load(&mut self, stdin: Option<&str>) {
        self.lines.clear();
        if let Some(text) = stdin {
            let normalized = text.replace("\r\n", "\n");
            let mut lines: Vec<&str> = normalized.split('\n').collect();
            if lines.last() == Some(&"") {
                lines.pop();
            }
            self.lines.extend(lines.into_iter().map(str::to_string));
        }
    }

    /// Whether a buffered line is available.
    pub fn has_next(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Pop the next line. Reading past the end yields an empty string.
    pub fn pop_next(&mut self) -> String {
        self.lines.pop_front().unwrap_or_default()
    }

    /// Number of lines left.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}
