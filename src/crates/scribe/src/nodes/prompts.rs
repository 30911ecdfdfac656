//! Prompt templates for LLM-backed nodes.

/// Template for turning a user's research request into a single topic
/// proposal. The model must answer with one JSON object and nothing else.
const RESEARCH_TOPIC_TEMPLATE: &str = "\
You are a research editor for a knowledge vault. A reader asked for an \
article with the following request:

{prompt}

Propose exactly one research topic for a new article. Respond with a single \
JSON object and no other text, using this shape:

{
  \"title\": \"concise article title\",
  \"summary\": \"two-sentence description of the article\",
  \"tags\": [\"three\", \"short\", \"tags\"],
  \"slug\": \"lowercase-hyphenated-slug\"
}";

/// Render the research-topic prompt for a user request.
pub fn research_topic(prompt: &str) -> String {
    RESEARCH_TOPIC_TEMPLATE.replace("{prompt}", prompt)
}
