//! Prompt templates for the support assistant.
//!
//! Templates are plain `format!()` interpolation so a missing variable is a
//! compile-time error.

/// Shown in place of the information block when retrieval found nothing.
pub const NO_INFORMATION_SENTINEL: &str = "No relevant information was found in the knowledge base.";

const PASSAGE_SEPARATOR: &str = "\n- ";

/// Map a language code to the name used in the output-language directive.
///
/// Unknown codes fall back to a neutral phrase rather than failing.
pub fn language_name(language_code: &str) -> &'static str {
    match language_code.trim().to_lowercase().as_str() {
        "ru" => "Russian",
        "uz" => "Uzbek",
        "en" => "English",
        _ => "the user's language",
    }
}

/// Strip quote characters and flatten line breaks so a passage renders as
/// one bullet.
pub fn sanitize_passage(passage: &str) -> String {
    passage
        .chars()
        .filter(|c| *c != '\'' && *c != '"')
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Build the retrieval-augmented instruction for one user message.
///
/// The output contains, in order: the persona and output-language directive,
/// the answering rules, the provided information (or a sentinel when
/// `passages` is empty), and the user message verbatim.
///
/// # Example
/// ```
/// use deskmate::llm::prompts::compose_rag_prompt;
///
/// let passages = vec!["Solution: Reload the page.".to_string()];
/// let prompt = compose_rag_prompt("How do I fix the CRM?", &passages, "en");
/// assert!(prompt.contains("write your entire response in English"));
/// assert!(prompt.contains("Reload the page"));
/// ```
pub fn compose_rag_prompt(question: &str, passages: &[String], language_code: &str) -> String {
    let language = language_name(language_code);

    let information = if passages.is_empty() {
        NO_INFORMATION_SENTINEL.to_string()
    } else {
        let joined = passages
            .iter()
            .map(|p| sanitize_passage(p))
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);
        format!("- {joined}")
    };

    format!(
        r#"You are a helpful and polite IT support assistant for bank employees. VERY IMPORTANT: You MUST write your entire response in {language}.

RULES:
1. Answer the USER MESSAGE strictly based on the PROVIDED INFORMATION. Do not use outside knowledge.
2. If the PROVIDED INFORMATION is missing or not enough to answer, apologize and advise the user to contact the IT support department.
3. If the USER MESSAGE is a greeting or an expression of gratitude, reply politely and briefly without using the PROVIDED INFORMATION.

PROVIDED INFORMATION:
{information}

USER MESSAGE:
{question}"#
    )
}

/// Ask for exactly one intent label for `message`.
///
/// # Example
/// ```
/// use deskmate::llm::prompts::intent_classification_prompt;
///
/// let prompt = intent_classification_prompt("thanks a lot!");
/// assert!(prompt.contains("thanks a lot!"));
/// assert!(prompt.contains("Gratitude"));
/// ```
pub fn intent_classification_prompt(message: &str) -> String {
    format!(
        r#"Classify the intent of the user message below. Reply with exactly one word: Question, Greeting, or Gratitude.

- Greeting: the message only says hello or similar.
- Gratitude: the message only thanks the assistant.
- Question: anything else, including problem reports and requests for help.

User message:
{message}

Label:"#
    )
}
