//! Presentation seam between the controller and whatever shows the interview.

use std::io::Write;

use model_gateway::Role;

/// Appended to partial replies while they stream. Never stored.
pub const STREAM_CURSOR: &str = "▌";
/// Partial replies are shown only once the buffer is longer than this many characters.
pub const PARTIAL_DISPLAY_THRESHOLD: usize = 5;

pub trait Presenter {
    /// Replaces the in-progress reply with `text` (cursor included).
    fn show_partial(&mut self, text: &str);
    /// Drops the in-progress reply without replacing it.
    fn clear_partial(&mut self);
    /// Shows a finished message; replaces any in-progress reply.
    fn show_message(&mut self, role: Role, text: &str);
    fn notice(&mut self, text: &str);
    fn warn(&mut self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialLine {
    body: String,
    cursor: bool,
}

/// Line-oriented presenter for plain terminals.
///
/// Partial replies are extended in place: only the new suffix is written and
/// the cursor glyph is erased with a backspace before each extension.
pub struct TerminalPresenter<W: Write> {
    out: W,
    interviewer_avatar: String,
    respondent_avatar: String,
    partial: Option<PartialLine>,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(
        out: W,
        interviewer_avatar: impl Into<String>,
        respondent_avatar: impl Into<String>,
    ) -> Self {
        Self {
            out,
            interviewer_avatar: interviewer_avatar.into(),
            respondent_avatar: respondent_avatar.into(),
            partial: None,
        }
    }

    /// Prints the respondent input prompt.
    pub fn prompt(&mut self) {
        let _ = write!(self.out, "{} > ", self.respondent_avatar);
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Erases the cursor, ends the partial line, and forgets it.
    fn finish_partial(&mut self) -> Option<String> {
        let line = self.partial.take()?;
        if line.cursor {
            let _ = write!(self.out, "\u{8} \u{8}");
        }
        let _ = writeln!(self.out);
        Some(line.body)
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_partial(&mut self, text: &str) {
        let body = text.strip_suffix(STREAM_CURSOR).unwrap_or(text);
        let cursor = body.len() != text.len();

        match self.partial.take() {
            Some(line) if body.starts_with(line.body.as_str()) => {
                if line.cursor {
                    let _ = write!(self.out, "\u{8}");
                }
                let _ = write!(self.out, "{}", &body[line.body.len()..]);
            }
            Some(line) => {
                self.partial = Some(line);
                self.finish_partial();
                let _ = write!(self.out, "{} {body}", self.interviewer_avatar);
            }
            None => {
                let _ = write!(self.out, "{} {body}", self.interviewer_avatar);
            }
        }

        if cursor {
            let _ = write!(self.out, "{STREAM_CURSOR}");
        }
        let _ = self.out.flush();
        self.partial = Some(PartialLine {
            body: body.to_string(),
            cursor,
        });
    }

    fn clear_partial(&mut self) {
        self.finish_partial();
        let _ = self.out.flush();
    }

    fn show_message(&mut self, role: Role, text: &str) {
        if self.finish_partial().as_deref() != Some(text) {
            let avatar = match role {
                Role::User => &self.respondent_avatar,
                Role::Assistant | Role::System => &self.interviewer_avatar,
            };
            let _ = writeln!(self.out, "{avatar} {text}");
        }
        let _ = self.out.flush();
    }

    fn notice(&mut self, text: &str) {
        self.finish_partial();
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn warn(&mut self, text: &str) {
        self.finish_partial();
        let _ = writeln!(self.out, "warning: {text}");
        let _ = self.out.flush();
    }
}
