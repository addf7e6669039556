//! # Prompt Builder
//!
//! Pure functions turning source text and a requested style into the
//! messages sent to the completion service.

use std::borrow::Cow;

use crate::{
    llm::completion::ChatMessage,
    types::{NoteAction, SourceLocator, SummaryRequest, SummaryStyle},
};

pub const TRUNCATION_MARKER: &str = "...[content truncated]";
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 50_000;

const SUMMARIZE_SYSTEM_PROMPT: &str = include_str!("./prompts/summarize_system.txt");
const CHAT_SYSTEM_PROMPT: &str = include_str!("./prompts/chat_system.txt");
const NOTE_GENERATE_PROMPT: &str = include_str!("./prompts/note_generate.txt");
const NOTE_EXPAND_PROMPT: &str = include_str!("./prompts/note_expand.txt");
const NOTE_SUMMARIZE_PROMPT: &str = include_str!("./prompts/note_summarize.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub text: String,
    pub truncated: bool,
    /// Length of the source before truncation, in characters.
    pub original_length: usize,
}

fn instruction(style: SummaryStyle) -> &'static str {
    match style {
        SummaryStyle::Brief => "a brief summary in 2-3 sentences",
        SummaryStyle::BulletPoints => {
            "a bullet-point breakdown of the main topics and key insights"
        }
        SummaryStyle::Detailed => {
            "a comprehensive, detailed summary organized into sections and ending with a conclusion"
        }
        SummaryStyle::General => "a clear and well-organized summary",
    }
}

/// Caps `text` at `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was cut.
pub fn truncate_source(text: &str, max_chars: usize) -> (Cow<'_, str>, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (
            Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut])),
            true,
        ),
        None => (Cow::Borrowed(text), false),
    }
}

/// Builds the user instruction for summarizing `source_text`.
pub fn build_prompt(
    source_text: &str,
    style: SummaryStyle,
    source_label: &str,
    max_chars: usize,
) -> BuiltPrompt {
    let (embedded, truncated) = truncate_source(source_text, max_chars);
    let text = format!(
        "Please provide {} of the following content from {source_label}.\n\n---\n{embedded}\n---",
        instruction(style),
    );

    BuiltPrompt {
        text,
        truncated,
        original_length: source_text.chars().count(),
    }
}

impl SummaryRequest {
    pub fn source_label(&self) -> String {
        match &self.source.locator {
            SourceLocator::Url(url) => format!("the web page \"{}\" ({url})", self.source.title),
            SourceLocator::VideoId(id) => {
                format!("the transcript of the YouTube video \"{}\" ({id})", self.source.title)
            }
        }
    }

    pub fn prompt(&self, max_chars: usize) -> BuiltPrompt {
        build_prompt(&self.source_text, self.style, &self.source_label(), max_chars)
    }
}

pub fn summary_messages(prompt: &BuiltPrompt) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARIZE_SYSTEM_PROMPT),
        ChatMessage::user(prompt.text.clone()),
    ]
}

pub fn chat_messages(prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(CHAT_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

/// Messages for the note assistant. Returns whether `context` was truncated.
pub fn note_messages(
    action: NoteAction,
    prompt: &str,
    context: Option<&str>,
    max_chars: usize,
) -> (Vec<ChatMessage>, bool) {
    let system = match action {
        NoteAction::Generate => NOTE_GENERATE_PROMPT,
        NoteAction::Expand => NOTE_EXPAND_PROMPT,
        NoteAction::Summarize => NOTE_SUMMARIZE_PROMPT,
    };

    let (user, truncated) = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => {
            let (context, truncated) = truncate_source(context, max_chars);
            (format!("Context:\n{context}\n\nRequest:\n{prompt}"), truncated)
        }
        None => (prompt.to_string(), false),
    };

    (
        vec![ChatMessage::system(system), ChatMessage::user(user)],
        truncated,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{llm::completion::Role, types::SourceMetadata};

    const ALL_STYLES: [SummaryStyle; 4] = [
        SummaryStyle::General,
        SummaryStyle::Brief,
        SummaryStyle::BulletPoints,
        SummaryStyle::Detailed,
    ];

    #[test]
    fn test_each_style_fragment_and_source_appear_once() {
        let source = "Photosynthesis converts light energy into chemical energy.";
        for style in ALL_STYLES {
            let prompt = build_prompt(source, style, "the web page \"Plants\"", 1_000);
            assert_eq!(prompt.text.matches(instruction(style)).count(), 1, "{style}");
            assert_eq!(prompt.text.matches(source).count(), 1, "{style}");
            assert!(!prompt.truncated);

            for other in ALL_STYLES.iter().filter(|s| **s != style) {
                assert!(!prompt.text.contains(instruction(*other)), "{style} vs {other}");
            }
        }
    }

    #[test]
    fn test_truncation_law() {
        let source = "abcdefghij".repeat(10);
        let (embedded, truncated) = truncate_source(&source, 25);
        assert!(truncated);
        assert_eq!(embedded, format!("{}{TRUNCATION_MARKER}", &source[..25]));

        let prompt = build_prompt(&source, SummaryStyle::Brief, "label", 25);
        assert!(prompt.truncated);
        assert_eq!(prompt.original_length, 100);
        assert!(prompt.text.contains(&*embedded));
        assert!(!prompt.text.contains(&source));
    }

    #[test]
    fn test_no_truncation_at_exact_limit() {
        let source = "x".repeat(50);
        let (embedded, truncated) = truncate_source(&source, 50);
        assert!(!truncated);
        assert_eq!(embedded, source);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let source = "héllo wörld ✓ ünïcode";
        let (embedded, truncated) = truncate_source(source, 5);
        assert!(truncated);
        assert_eq!(embedded, format!("héllo{TRUNCATION_MARKER}"));
    }

    #[test]
    fn test_summary_request_label() {
        let request = SummaryRequest {
            source_text: "text".into(),
            style: SummaryStyle::General,
            source: SourceMetadata {
                title: "Launch day".into(),
                locator: SourceLocator::VideoId("dQw4w9WgXcQ".into()),
            },
        };
        let prompt = request.prompt(DEFAULT_MAX_CONTENT_LENGTH);
        assert!(prompt.text.contains("YouTube video \"Launch day\" (dQw4w9WgXcQ)"));

        let messages = summary_messages(&prompt);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, prompt.text);
    }

    #[test]
    fn test_note_messages_select_system_prompt_by_action() {
        let (generate, _) = note_messages(NoteAction::Generate, "p", None, 100);
        let (expand, _) = note_messages(NoteAction::Expand, "p", None, 100);
        let (summarize, _) = note_messages(NoteAction::Summarize, "p", None, 100);

        assert_eq!(generate[0].content, NOTE_GENERATE_PROMPT);
        assert_eq!(expand[0].content, NOTE_EXPAND_PROMPT);
        assert_eq!(summarize[0].content, NOTE_SUMMARIZE_PROMPT);
        assert_eq!(generate[1].content, "p");
    }

    #[test]
    fn test_note_context_is_capped() {
        let context = "c".repeat(30);
        let (messages, truncated) =
            note_messages(NoteAction::Expand, "make it longer", Some(&context), 10);

        assert!(truncated);
        assert_eq!(
            messages[1].content,
            format!("Context:\n{}{TRUNCATION_MARKER}\n\nRequest:\nmake it longer", "c".repeat(10))
        );
    }
}
