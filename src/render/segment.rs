use serde_json::Value;
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Reasoning,
    Response,
    ToolInvocation,
    ToolResult,
}

/// One categorised write to the output sink.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Reasoning(String),
    Response(String),
    ToolName(String),
    ToolInput(String),
    ToolResult { status: String, text: String },
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Reasoning(_) => SegmentKind::Reasoning,
            Segment::Response(_) => SegmentKind::Response,
            Segment::ToolName(_) | Segment::ToolInput(_) => SegmentKind::ToolInvocation,
            Segment::ToolResult { .. } => SegmentKind::ToolResult,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Reasoning(text) => write!(f, "\n🤔 Reasoning:\n{text}\n"),
            Segment::Response(text) => write!(f, "\n💬 Response:\n{text}\n"),
            Segment::ToolName(name) => write!(f, "\n🔧 Tool: {name}"),
            Segment::ToolInput(input) => write!(f, "\n🔧 Parameters:\n{input}\n"),
            Segment::ToolResult { status, text } => {
                write!(f, "\n⚙️ Result ({status}):\n\n{text}\n")
            }
        }
    }
}

/// Compact key/value rendering of tool parameters.
pub fn render_tool_input(input: &Value) -> String {
    input.to_string()
}

/// Append-only destination for rendered segments.
pub trait SegmentSink {
    fn emit(&mut self, segment: Segment) -> io::Result<()>;
}

impl SegmentSink for Vec<Segment> {
    fn emit(&mut self, segment: Segment) -> io::Result<()> {
        self.push(segment);
        Ok(())
    }
}

/// Writes the terminal form of each segment, one line each, flushing after
/// every write so streamed output shows up immediately.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SegmentSink for WriterSink<W> {
    fn emit(&mut self, segment: Segment) -> io::Result<()> {
        writeln!(self.writer, "{segment}")?;
        self.writer.flush()
    }
}
