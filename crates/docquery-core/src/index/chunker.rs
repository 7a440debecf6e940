//! Splitting oversized text into bounded chunks
//!
//! Chunks partition the input exactly: concatenating them in order gives back
//! the original text. Sizes are measured in characters.

/// Fraction of the chunk size searched backwards for a natural break
pub const DEFAULT_LOOKBACK_PERCENT: usize = 30;

/// A contiguous piece of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Zero-based order of the chunk in the input
    pub index: usize,
    /// Byte offset of the chunk in the input
    pub position: usize,
}

/// Splits text at paragraph, sentence or word boundaries where possible
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_chunk_chars: usize,
    lookback_chars: usize,
}

impl Chunker {
    pub fn new(max_chunk_chars: usize) -> Self {
        let max_chunk_chars = max_chunk_chars.max(1);
        Self {
            max_chunk_chars,
            lookback_chars: max_chunk_chars * DEFAULT_LOOKBACK_PERCENT / 100,
        }
    }

    /// Set how many characters before the hard limit are searched for a boundary
    pub fn with_lookback(mut self, lookback_chars: usize) -> Self {
        self.lookback_chars = lookback_chars.min(self.max_chunk_chars - 1);
        self
    }

    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    /// Split text into ordered chunks
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        self.iter(text).collect()
    }

    /// Lazily split text. The iterator is `Clone`, so a split can be restarted.
    pub fn iter<'a>(&self, text: &'a str) -> ChunkIter<'a> {
        ChunkIter {
            text,
            max_chunk_chars: self.max_chunk_chars,
            lookback_chars: self.lookback_chars.min(self.max_chunk_chars - 1),
            pos: 0,
            index: 0,
        }
    }
}

/// Split `text` into chunks of at most `max_chunk_size` characters
pub fn split(text: &str, max_chunk_size: usize) -> Vec<Chunk> {
    Chunker::new(max_chunk_size).split(text)
}

/// Iterator over the chunks of a text
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    text: &'a str,
    max_chunk_chars: usize,
    lookback_chars: usize,
    pos: usize,
    index: usize,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.pos >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.pos..];
        let hard_end = byte_offset_of_char(rest, self.max_chunk_chars);

        let cut = if hard_end >= rest.len() {
            rest.len()
        } else {
            let window_start =
                byte_offset_of_char(rest, self.max_chunk_chars - self.lookback_chars);
            find_boundary(&rest[window_start..hard_end])
                .map(|offset| window_start + offset)
                .filter(|cut| *cut > 0)
                .unwrap_or(hard_end)
        };

        let chunk = Chunk {
            text: rest[..cut].to_string(),
            index: self.index,
            position: self.pos,
        };
        self.pos += cut;
        self.index += 1;
        Some(chunk)
    }
}

/// Byte offset of the `n`th character, or the string length if shorter
fn byte_offset_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Offset just past the best break point in `region`, preferring paragraphs,
/// then sentences, then lines, then any whitespace
fn find_boundary(region: &str) -> Option<usize> {
    if let Some(pos) = region.rfind("\n\n") {
        return Some(pos + 2);
    }

    let sentence_end = [". ", "? ", "! ", ".\n"]
        .iter()
        .filter_map(|pat| region.rfind(pat).map(|pos| pos + pat.len()))
        .max();
    if sentence_end.is_some() {
        return sentence_end;
    }

    if let Some(pos) = region.rfind('\n') {
        return Some(pos + 1);
    }

    region
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(pos, c)| pos + c.len_utf8())
}
