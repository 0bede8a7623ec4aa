use crate::sections::SectionSplitter;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Requested overlap between adjacent chunks. Accepted for callers that
    /// tune it, but not applied by any of the current strategies.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Turns normalized document text into an ordered list of bounded chunks.
///
/// When the text carries recognizable section headings, each section is
/// chunked on its own and no chunk spans a section boundary. Otherwise the
/// text is accumulated paragraph by paragraph up to the target size.
pub struct Chunker {
    splitter: SectionSplitter,
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            splitter: SectionSplitter::new()?,
            config,
        })
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let sections = self.splitter.split(text);
        if sections.len() > 1 {
            self.chunk_sections(&sections)
        } else {
            self.chunk_paragraphs(text)
        }
    }

    /// Sections at or under the target size are emitted whole; oversized
    /// sections fall back to word-level accumulation.
    fn chunk_sections(&self, sections: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        for section in sections {
            if char_len(section) <= self.config.chunk_size {
                chunks.push(section.clone());
            } else {
                chunks.extend(chunk_words(section, self.config.chunk_size));
            }
        }
        chunks
    }

    /// Greedy paragraph accumulation: paragraphs are never split, so a
    /// paragraph longer than the target size becomes an oversized chunk.
    fn chunk_paragraphs(&self, text: &str) -> Vec<String> {
        let paragraphs = text
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty());

        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in paragraphs {
            if char_len(&current) + char_len(paragraph) < self.config.chunk_size {
                current.push_str(paragraph);
                current.push_str("\n\n");
            } else {
                if !current.trim().is_empty() {
                    chunks.push(current.trim().to_string());
                }
                current = format!("{paragraph}\n\n");
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Space-joined word accumulation for sections that exceed the target size.
/// A single word longer than the target is never truncated; it starts its
/// own oversized chunk.
fn chunk_words(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_length = 0usize;

    for word in text.split_whitespace() {
        let word_length = char_len(word);
        if current_length + word_length + 1 <= chunk_size {
            current.push(word);
            current_length += word_length + 1;
        } else {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = vec![word];
            current_length = word_length;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}
