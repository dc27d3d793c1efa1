//! Line/column to byte offset conversion for editor ranges.

/// Zero-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// Line start table of a text, built once per document version.
///
/// `\n`, `\r\n` and a lone `\r` all terminate a line.
#[derive(Debug, Clone)]
pub struct DocumentPositionIndex {
    text: String,
    line_starts: Vec<usize>,
    /// End of each line, excluding its terminator.
    line_ends: Vec<usize>,
}

impl DocumentPositionIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut line_ends = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\r' => {
                    line_ends.push(i);
                    i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    line_starts.push(i);
                }
                b'\n' => {
                    line_ends.push(i);
                    i += 1;
                    line_starts.push(i);
                }
                _ => i += 1,
            }
        }
        line_ends.push(bytes.len());

        Self {
            text: text.to_string(),
            line_starts,
            line_ends,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a signed line/column pair to a byte offset, clamping every
    /// out-of-range input to the nearest valid offset.
    pub fn to_offset(&self, line: i64, character: i64) -> usize {
        if line < 0 {
            return 0;
        }
        let Some(line) = usize::try_from(line).ok().filter(|&l| l < self.line_count()) else {
            return self.text.len();
        };

        let start = self.line_starts[line];
        if character < 0 {
            return start;
        }
        let end = self.line_ends[line];
        let offset = usize::try_from(character).map_or(end, |c| start.saturating_add(c));
        if offset >= end {
            return end;
        }
        self.floor_char_boundary(offset)
    }

    /// Converts a byte offset to a line/column position.
    pub fn to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insertion) => insertion - 1,
        };
        Position::new(line, offset - self.line_starts[line])
    }

    fn floor_char_boundary(&self, mut offset: usize) -> usize {
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
