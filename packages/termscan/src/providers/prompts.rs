//! Prompts sent to the summarization backends.

/// Instruction prepended to the page text.
pub const SUMMARY_PROMPT: &str = "Summarize the following Terms and Conditions or legal document \
in a concise, easy-to-understand manner, highlighting key points, user obligations, data privacy, \
and termination clauses. Make it under 200 words and highlight important points and format it in \
an easy to understand, not boring manner. Use bullet points, bold text etc. where relevant.";

/// System message for chat-style providers.
pub const SYSTEM_PROMPT: &str =
    "You are a careful legal analyst who explains contracts to non-lawyers.";

/// Full user prompt for `content`: instruction, blank line, text.
pub fn summary_prompt(content: &str) -> String {
    format!("{}\n\n{}", SUMMARY_PROMPT, content)
}
