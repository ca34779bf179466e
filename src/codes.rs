//! Reserved termination codes and the incremental scanner that finds them.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROBLEMATIC_CODE: &str = "5j3k";
pub const DEFAULT_COMPLETE_CODE: &str = "x7y8";
pub const DEFAULT_PROBLEMATIC_MESSAGE: &str =
    "Thank you for participating, the interview concludes here.";
pub const DEFAULT_COMPLETE_MESSAGE: &str = "Thank you for participating in the interview, this was the last question. Please continue with the remaining sections in the survey part. Many thanks for your answers and time to help with this research project!";

/// Why the model asked to end the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Problematic,
    Complete,
}

impl CodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Problematic => "problematic",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReservedCode {
    pub code: String,
    pub message: String,
}

impl ReservedCode {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The two reserved tokens and the closing message each one maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReservedCodes {
    pub problematic: ReservedCode,
    pub complete: ReservedCode,
}

impl Default for ReservedCodes {
    fn default() -> Self {
        Self {
            problematic: ReservedCode::new(DEFAULT_PROBLEMATIC_CODE, DEFAULT_PROBLEMATIC_MESSAGE),
            complete: ReservedCode::new(DEFAULT_COMPLETE_CODE, DEFAULT_COMPLETE_MESSAGE),
        }
    }
}

impl ReservedCodes {
    pub fn get(&self, kind: CodeKind) -> &ReservedCode {
        match kind {
            CodeKind::Problematic => &self.problematic,
            CodeKind::Complete => &self.complete,
        }
    }

    /// Codes in match priority; problematic content wins when both appear.
    pub fn in_priority_order(&self) -> [(CodeKind, &ReservedCode); 2] {
        [
            (CodeKind::Problematic, &self.problematic),
            (CodeKind::Complete, &self.complete),
        ]
    }

    /// One-shot substring check over a complete text.
    pub fn detect(&self, text: &str) -> Option<CodeKind> {
        self.in_priority_order()
            .into_iter()
            .find(|(_, reserved)| text.contains(reserved.code.as_str()))
            .map(|(kind, _)| kind)
    }

    pub fn max_code_len(&self) -> usize {
        self.problematic.code.len().max(self.complete.code.len())
    }

    pub fn validate(&self) -> Result<(), String> {
        for (kind, reserved) in self.in_priority_order() {
            if reserved.code.trim().is_empty() {
                return Err(format!("{} code must not be empty", kind.as_str()));
            }
            if reserved.code.trim() != reserved.code {
                return Err(format!(
                    "{} code must not carry surrounding whitespace",
                    kind.as_str()
                ));
            }
            if reserved.message.trim().is_empty() {
                return Err(format!("{} closing message must not be empty", kind.as_str()));
            }
        }

        let problematic = self.problematic.code.as_str();
        let complete = self.complete.code.as_str();
        if problematic.contains(complete) || complete.contains(problematic) {
            return Err(format!(
                "reserved codes '{problematic}' and '{complete}' must be distinct and neither may contain the other"
            ));
        }

        Ok(())
    }
}

/// Finds reserved codes in a buffer that only ever grows by appending.
///
/// Each call rescans only the bytes added since the previous call plus enough
/// overlap to catch a code split across fragments.
#[derive(Debug, Clone)]
pub struct CodeScanner {
    codes: Vec<(CodeKind, String)>,
    overlap: usize,
    scanned: usize,
}

impl CodeScanner {
    pub fn new(codes: &ReservedCodes) -> Self {
        Self {
            codes: codes
                .in_priority_order()
                .into_iter()
                .map(|(kind, reserved)| (kind, reserved.code.clone()))
                .collect(),
            overlap: codes.max_code_len().saturating_sub(1),
            scanned: 0,
        }
    }

    pub fn scan(&mut self, buffer: &str) -> Option<CodeKind> {
        if self.scanned > buffer.len() {
            self.scanned = 0;
        }

        let mut start = self.scanned.saturating_sub(self.overlap);
        while !buffer.is_char_boundary(start) {
            start -= 1;
        }
        self.scanned = buffer.len();

        let window = &buffer[start..];
        self.codes
            .iter()
            .find(|(_, code)| window.contains(code.as_str()))
            .map(|(kind, _)| *kind)
    }

    pub fn reset(&mut self) {
        self.scanned = 0;
    }
}
