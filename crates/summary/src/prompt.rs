//! Prompt construction for issue summarisation.

/// Role given to the assistant for every summarisation request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarises text.";

/// Wrap a trimmed issue description in the fixed summarisation instruction.
pub fn summary_prompt(description: &str) -> String {
    format!(
        "Please provide a concise summary of around 10 words for the following issue \
         description:\n\n{description}\n\nSummary:"
    )
}
