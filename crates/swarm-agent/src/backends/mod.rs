//! Model backends.
//!
//! To add a new provider:
//! 1. Create a new module here implementing [`ModelGateway`](crate::ModelGateway)
//! 2. Add the variant to `ModelProvider` in `config.rs`
//! 3. Wire it up in `create_model()` in `llm.rs`

/// LM Studio chat-completions client.
pub mod lm_studio;
/// Deterministic canned replies.
pub mod mock;

/// First `max_chars` characters of `text`, for log lines.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "hé");
        assert_eq!(preview("short", 100), "short");
    }
}
