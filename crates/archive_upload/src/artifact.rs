use model_gateway::Message;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Named payload ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

impl ArchiveArtifact {
    /// CSV export of `messages`, named `{respondent_id}_transcript.csv`.
    #[must_use]
    pub fn transcript_csv(respondent_id: &str, messages: &[Message]) -> Self {
        Self {
            file_name: format!("{respondent_id}_transcript.csv"),
            content_type: CSV_CONTENT_TYPE,
            body: export_csv(messages),
        }
    }
}

/// Renders `role,content` rows with RFC 4180 quoting.
#[must_use]
pub fn export_csv(messages: &[Message]) -> String {
    let mut out = String::from("role,content\n");
    for message in messages {
        push_field(&mut out, message.role.as_str());
        out.push(',');
        push_field(&mut out, &message.content);
        out.push('\n');
    }
    out
}

fn push_field(out: &mut String, value: &str) {
    if !value.contains(&[',', '"', '\n', '\r'][..]) {
        out.push_str(value);
        return;
    }

    out.push('"');
    for ch in value.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn plain_fields_are_written_bare() {
        let csv = export_csv(&[Message::system("outline"), Message::assistant("Welcome")]);

        assert_eq!(csv, "role,content\nsystem,outline\nassistant,Welcome\n");
    }

    #[test]
    fn fields_with_separators_quotes_or_newlines_are_quoted() {
        let csv = export_csv(&[
            Message::user("yes, \"mostly\""),
            Message::assistant("first\nsecond"),
        ]);

        assert_eq!(
            csv,
            "role,content\nuser,\"yes, \"\"mostly\"\"\"\nassistant,\"first\nsecond\"\n"
        );
    }

    #[test]
    fn empty_history_exports_header_only() {
        assert_eq!(export_csv(&[]), "role,content\n");
    }

    #[test]
    fn artifact_is_named_after_respondent() {
        let artifact = ArchiveArtifact::transcript_csv("r1", &[Message::user("hi")]);

        assert_eq!(artifact.file_name, "r1_transcript.csv");
        assert_eq!(artifact.content_type, "text/csv");
        assert_eq!(artifact.body, "role,content\nuser,hi\n");
    }
}
