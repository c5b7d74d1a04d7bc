pub static SUMMARY_SYSTEM_MESSAGE: &str =
    "You are a helpful study assistant that formats notes perfectly in HTML.";

pub static SUMMARY_PREAMBLE: &str = "Summarize the following text for revision.";

pub static SUMMARY_INSTRUCTIONS: &str = "Structure the output as clean, semantic HTML.
- Use <h3> tags for main topics or keywords.
- Use <p> tags for explanations.
- Use <ul> and <li> tags for any lists.
- Use <strong> tags for key terms within a paragraph.

Do not include any text outside of this HTML structure (like \"Here is your summary...\").
Do not include <html>, <head>, or <body> tags. Only provide the HTML fragment for the body content.";

pub static FLASHCARD_SYSTEM_MESSAGE: &str = "You are a helpful study assistant. Your ONLY output must be a valid, parsable JSON array of flashcard objects, each with 'question' and 'answer' keys. Do not output any markdown code fences (```json) or text.";

pub static FLASHCARD_PREAMBLE: &str =
    "Generate 5 high-quality, concise flashcards from the following summarized study text.";

pub static FLASHCARD_INSTRUCTIONS: &str = "Each flashcard must test a core concept, key term, or essential function from the text.
Specifically, ensure you include:
a) At least one **definition** card (e.g., 'What is X?').
b) At least one **example/function** card (e.g., 'Give an example of Y.').
c) At least one card focusing on a **scheduling algorithm** or **OS type**.";

pub static FLASHCARD_OUTPUT_SCHEMA: &str = "Return the result STRICTLY as a valid JSON array of objects. Do not include any introductory or concluding text. The objects must have only two keys: 'question' (the question) and 'answer' (the direct answer).";
