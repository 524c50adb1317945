//! Prompt templates for structured generation
//!
//! Placeholders use `{name}` and are filled by [`render`].

pub const SUB_QUERY_PROMPT: &str = r#"You are an assistant specialized in breaking a research question into focused sub-queries.
If the question is simple and needs no decomposition, return only the original question.

Current year: {current_year}. Prefer sub-queries that account for the most current information.

Question:
{original_query}

Example for "Explain deep learning":
{"queries": ["What is deep learning?", "How does deep learning differ from machine learning?", "What is the history of deep learning?"]}

Respond with a JSON object of the form {"queries": ["..."]} and nothing else."#;

pub const REFLECT_PROMPT: &str = r#"You are an expert research assistant analyzing findings about: {original_query}

Goals:
1. Identify knowledge gaps or areas that need deeper exploration.
2. Propose follow-up questions that would close those gaps.
3. Focus on technical details, implementation specifics or emerging trends not yet covered.

Queries already asked:
{previous_queries}

Findings so far:
{previous_documents}

Respond with a JSON object {"sub_queries": ["..."], "complete": false}.
If the findings already answer the question, respond with {"sub_queries": [], "complete": true}."#;

pub const SUMMARIZER_PROMPT: &str = r#"You are an assistant specialized in writing detailed research answers.
Write a specific, coherent answer to the question using the retrieved material below.
Highlight the information most relevant to the question and skip anything unrelated.
When the material contains an earlier summary, integrate the new information into it rather than repeating it.

Question:
{original_query}

Retrieved material:
{chunks}

Respond with a JSON object {"summary": "..."}."#;

pub const FLASHCARD_PROMPT: &str = r#"You are an assistant specialized in creating effective study flashcards.
Create exactly {quantity} flashcards from the text below. Each card has:
- question: a concise question covering a main concept, fact or key idea
- answer: a clear, direct and complete answer

Focus on essential information, paraphrase instead of quoting, keep each side under 200 words and write in {language}.

Text:
{text}

Respond with a JSON object {"flashcards": [{"question": "...", "answer": "..."}]}."#;

/// Replace `{key}` placeholders with their values
pub fn render(template: &str, variables: &[(&str, &str)]) -> String {
    variables
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_placeholders() {
        let rendered = render(
            SUB_QUERY_PROMPT,
            &[("original_query", "What is RL?"), ("current_year", "2026")],
        );
        assert!(rendered.contains("What is RL?"));
        assert!(rendered.contains("2026"));
        assert!(!rendered.contains("{original_query}"));
        // JSON examples are left untouched
        assert!(rendered.contains(r#"{"queries": ["..."]}"#));
    }
}
