//! Separates an inline `<reasoning>...</reasoning>` prefix from model content.
//!
//! Bedrock's gpt-oss models return their chain of thought inside the
//! content field. Streamed chunks may cut the tags anywhere, so the splitter
//! holds back only as much text as could still turn out to be a tag.

pub const REASONING_OPEN: &str = "<reasoning>";
pub const REASONING_CLOSE: &str = "</reasoning>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Reasoning(String),
    Content(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum SplitState {
    #[default]
    Undecided,
    Reasoning,
    Content,
}

#[derive(Debug, Default)]
pub struct ReasoningSplitter {
    state: SplitState,
    pending: String,
}

impl ReasoningSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<Piece> {
        self.pending.push_str(chunk);
        let mut out = Vec::new();
        loop {
            match self.state {
                SplitState::Undecided => {
                    let head = self.pending.trim_start();
                    let maybe_tag = REASONING_OPEN.starts_with(head) && head != REASONING_OPEN;
                    if head.is_empty() || maybe_tag {
                        return out;
                    }
                    if let Some(rest) = head.strip_prefix(REASONING_OPEN) {
                        self.pending = rest.to_string();
                        self.state = SplitState::Reasoning;
                    } else {
                        self.state = SplitState::Content;
                    }
                }
                SplitState::Reasoning => {
                    if let Some(end) = self.pending.find(REASONING_CLOSE) {
                        let reasoning = self.pending[..end].to_string();
                        self.pending = self.pending[end + REASONING_CLOSE.len()..].to_string();
                        if !reasoning.is_empty() {
                            out.push(Piece::Reasoning(reasoning));
                        }
                        self.state = SplitState::Content;
                        continue;
                    }
                    let held = partial_tag_suffix(&self.pending, REASONING_CLOSE);
                    let ready = self.pending.len() - held;
                    if ready > 0 {
                        let text: String = self.pending.drain(..ready).collect();
                        out.push(Piece::Reasoning(text));
                    }
                    return out;
                }
                SplitState::Content => {
                    if !self.pending.is_empty() {
                        out.push(Piece::Content(std::mem::take(&mut self.pending)));
                    }
                    return out;
                }
            }
        }
    }

    /// Flushes whatever is still held back once the stream has ended.
    pub fn finish(&mut self) -> Vec<Piece> {
        let rest = std::mem::take(&mut self.pending);
        if rest.is_empty() {
            return Vec::new();
        }
        match self.state {
            SplitState::Reasoning => vec![Piece::Reasoning(rest)],
            SplitState::Undecided | SplitState::Content => vec![Piece::Content(rest)],
        }
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `tag`.
fn partial_tag_suffix(text: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&n| {
            n <= text.len()
                && text.is_char_boundary(text.len() - n)
                && tag.starts_with(&text[text.len() - n..])
        })
        .unwrap_or(0)
}

/// Splits complete content into `(reasoning, answer)`. Whitespace padding
/// the inline block is dropped from both halves.
pub fn split_reasoning(content: &str) -> (Option<String>, String) {
    let mut splitter = ReasoningSplitter::new();
    let mut pieces = splitter.push(content);
    pieces.extend(splitter.finish());

    let mut reasoning: Option<String> = None;
    let mut answer = String::new();
    for piece in pieces {
        match piece {
            Piece::Reasoning(text) => reasoning.get_or_insert_with(String::new).push_str(&text),
            Piece::Content(text) => answer.push_str(&text),
        }
    }
    match reasoning {
        Some(reasoning) => (
            Some(reasoning.trim().to_string()),
            answer.trim_start().to_string(),
        ),
        None => (None, answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunks: &[&str]) -> (String, String) {
        let mut splitter = ReasoningSplitter::new();
        let mut pieces = Vec::new();
        for chunk in chunks {
            pieces.extend(splitter.push(chunk));
        }
        pieces.extend(splitter.finish());
        let mut reasoning = String::new();
        let mut content = String::new();
        for piece in pieces {
            match piece {
                Piece::Reasoning(t) => reasoning.push_str(&t),
                Piece::Content(t) => content.push_str(&t),
            }
        }
        (reasoning, content)
    }

    #[test]
    fn plain_content_passes_through() {
        assert_eq!(split_reasoning("The answer is 4."), (None, "The answer is 4.".to_string()));
    }

    #[test]
    fn inline_prefix_is_split() {
        let (reasoning, answer) =
            split_reasoning("<reasoning>2 plus 2 is 4</reasoning>The answer is 4.");
        assert_eq!(reasoning.as_deref(), Some("2 plus 2 is 4"));
        assert_eq!(answer, "The answer is 4.");
    }

    #[test]
    fn padding_around_inline_block_is_dropped() {
        let (reasoning, answer) =
            split_reasoning("<reasoning>\n2 plus 2 is 4\n</reasoning>\n\n    let x = 4;\n");
        assert_eq!(reasoning.as_deref(), Some("2 plus 2 is 4"));
        assert_eq!(answer, "let x = 4;\n");
    }

    #[test]
    fn unterminated_reasoning_keeps_everything_as_reasoning() {
        let (reasoning, answer) = split_reasoning("<reasoning>still thinking");
        assert_eq!(reasoning.as_deref(), Some("still thinking"));
        assert_eq!(answer, "");
    }

    #[test]
    fn tags_split_across_chunks() {
        let (reasoning, content) =
            collect(&["<reas", "oning>add", " them</rea", "soning>", "4"]);
        assert_eq!(reasoning, "add them");
        assert_eq!(content, "4");
    }

    #[test]
    fn content_that_only_looks_like_a_tag_start() {
        let (reasoning, content) = collect(&["<", "b>bold</b>"]);
        assert_eq!(reasoning, "");
        assert_eq!(content, "<b>bold</b>");
    }

    #[test]
    fn tag_later_in_content_is_not_reasoning() {
        let (reasoning, answer) = split_reasoning("Use <reasoning> tags like this.");
        assert!(reasoning.is_none());
        assert_eq!(answer, "Use <reasoning> tags like this.");
    }

    #[test]
    fn partial_suffix_detection() {
        assert_eq!(partial_tag_suffix("abc</rea", REASONING_CLOSE), 5);
        assert_eq!(partial_tag_suffix("abc", REASONING_CLOSE), 0);
        assert_eq!(partial_tag_suffix("é<", REASONING_CLOSE), 1);
    }
}
