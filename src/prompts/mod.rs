//! Built-in prompt text
//!
//! The system instruction sent with every request and the assistant reply
//! substituted when a completion fails.

/// Default system instruction asking for plain, numbered, well-organised answers
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a professional, helpful assistant. Follow these rules in every answer:

1. Organise the answer clearly.
2. Use numbers (1, 2, 3...) to separate the main points.
3. Never use asterisks, underscores, tildes or any other formatting markup.
4. Write plain text only.
5. Start with a direct answer to the question.
6. Give the important details in a numbered, orderly way.
7. End with a short summary when the question is complex.
8. Never show technical details such as tool_code, thought or queries.
9. Give the user only the final, clean answer.";

/// Assistant reply recorded when the completion service fails
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong while contacting the model. \
Check that an API key is configured (CHATSHELL_API_KEY or GOOGLE_API_KEY) and try again.";

/// Resolves the configured system prompt into the instruction to send
///
/// A blank prompt disables the system instruction entirely.
///
/// # Examples
///
/// ```
/// use chatshell::prompts::system_instruction;
///
/// assert_eq!(system_instruction("  "), None);
/// assert_eq!(system_instruction("Be brief."), Some("Be brief.".to_string()));
/// ```
pub fn system_instruction(prompt: &str) -> Option<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        None
    } else {
        Some(prompt.to_string())
    }
}
