pub mod chunking;
pub mod code_fence;
pub mod file_text_extraction;
pub mod llm_instructions;
pub mod prompt;
