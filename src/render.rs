//! Output rendering for the chat application.
//!
//! The session hands the renderer snapshots of the reply message as it grows.
//! Replies carry cumulative text, so the plain-text renderer remembers how much
//! it has already printed and writes only the new suffix.

use std::io::{self, Stdout, Write};

use crate::{Attachment, Message};

/// ANSI escape code for dim text (used for attachment listings).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the reply label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - A full-screen UI that redraws the whole message
pub trait Renderer: Send {
    /// Called before the first update of a reply.
    fn start_reply(&mut self);

    /// Called with the reply after every chunk.
    ///
    /// `message.text` is the cumulative text received so far.
    fn update_reply(&mut self, message: &Message);

    /// Called once with the reply in its terminal state.
    fn finish_reply(&mut self, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Show the attachments queued for the next message.
    fn print_attachments(&mut self, attachments: &[Attachment]);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    printed: usize,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            printed: 0,
        }
    }

    /// Consumes the renderer and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Flushes the writer to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn print_delta(&mut self, text: &str) {
        if text.len() >= self.printed && text.is_char_boundary(self.printed) {
            let _ = write!(self.out, "{}", &text[self.printed..]);
        } else {
            // The text was replaced rather than extended; start over.
            let _ = write!(self.out, "\n{text}");
        }
        self.printed = text.len();
        self.flush();
    }

    fn styled(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn start_reply(&mut self) {
        self.printed = 0;
        let label = self.styled(ANSI_CYAN, "model>");
        let _ = write!(self.out, "{label} ");
        self.flush();
    }

    fn update_reply(&mut self, message: &Message) {
        self.print_delta(&message.text);
    }

    fn finish_reply(&mut self, message: &Message) {
        if message.is_error() {
            let error = self.styled(ANSI_RED, &message.text);
            let _ = writeln!(self.out, "\n{error}");
        } else {
            self.print_delta(&message.text);
            let _ = writeln!(self.out);
        }
        self.printed = 0;
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        let error = self.styled(ANSI_RED, &format!("Error: {error}"));
        let _ = writeln!(self.out, "{error}");
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }

    fn print_attachments(&mut self, attachments: &[Attachment]) {
        if attachments.is_empty() {
            let _ = writeln!(self.out, "No attachments.");
            return;
        }
        for (index, attachment) in attachments.iter().enumerate() {
            let detail = self.styled(
                ANSI_DIM,
                &format!(
                    "({}, {})",
                    attachment.mime_type,
                    describe_size(attachment.decoded_len())
                ),
            );
            let _ = writeln!(self.out, "  [{}] {} {detail}", index + 1, attachment.name);
        }
        self.flush();
    }
}

/// Formats a byte count for humans.
pub fn describe_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= MIB {
        format!("{:.1} MiB", bytes_f / MIB)
    } else if bytes_f >= KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}
