//! A single named transformation in a chain.

use boidfactory_config::StageConfig;

use crate::template::{self, TemplateVars};

/// An immutable stage definition: name, instruction template and the file
/// extension its output is written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    name: String,
    instruction_template: String,
    extension: String,
}

/// What a stage sends to the generator for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedInstruction {
    pub instruction: String,
    /// Previous output piped on stdin when the template does not inline it.
    pub stdin: Option<String>,
}

impl Stage {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        instruction_template: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            instruction_template: instruction_template.into(),
            extension: extension.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn instruction_template(&self) -> &str {
        &self.instruction_template
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Build the instruction for this stage.
    ///
    /// `input` is the previous stage's output (or a seed). When the template
    /// references `{{input}}` it is inlined; otherwise a non-empty input goes
    /// to the generator on stdin.
    #[must_use]
    pub fn compose(&self, prompt: &str, input: Option<&str>) -> ComposedInstruction {
        let input = input.filter(|text| !text.is_empty());
        if template::references_input(&self.instruction_template) {
            ComposedInstruction {
                instruction: template::render(
                    &self.instruction_template,
                    &TemplateVars::new(prompt).with_input(input),
                ),
                stdin: None,
            }
        } else {
            ComposedInstruction {
                instruction: template::render(&self.instruction_template, &TemplateVars::new(prompt)),
                stdin: input.map(str::to_string),
            }
        }
    }
}

impl From<&StageConfig> for Stage {
    fn from(config: &StageConfig) -> Self {
        Self::new(&config.name, &config.instruction, &config.extension)
    }
}
