use common::utils::llm::CompletionRequest;

/// A chat prompt with named slots, rendered once per input text.
///
/// The user message is laid out as preamble, instructions, the labelled input
/// and finally the output schema. Empty slots are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    system: String,
    preamble: String,
    instructions: String,
    input_label: String,
    input_delimiter: Option<String>,
    output_schema: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn input_label(mut self, label: impl Into<String>) -> Self {
        self.input_label = label.into();
        self
    }

    /// Fence the input between two delimiter lines, e.g. `---`.
    #[must_use]
    pub fn input_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.input_delimiter = Some(delimiter.into());
        self
    }

    #[must_use]
    pub fn output_schema(mut self, schema: impl Into<String>) -> Self {
        self.output_schema = schema.into();
        self
    }

    pub fn render(&self, input: &str) -> CompletionRequest {
        let mut sections: Vec<String> = Vec::with_capacity(4);

        if !self.preamble.is_empty() {
            sections.push(self.preamble.clone());
        }
        if !self.instructions.is_empty() {
            sections.push(self.instructions.clone());
        }

        let body = match &self.input_delimiter {
            Some(delimiter) => format!("{delimiter}\n{input}\n{delimiter}"),
            None => input.to_string(),
        };
        sections.push(if self.input_label.is_empty() {
            body
        } else {
            format!("{}:\n{body}", self.input_label)
        });

        if !self.output_schema.is_empty() {
            sections.push(self.output_schema.clone());
        }

        CompletionRequest {
            system: self.system.clone(),
            user: sections.join("\n\n"),
        }
    }
}
