//! Placeholder substitution for stage instructions.
//!
//! Three placeholders are recognised: `{{prompt}}`, `{{input}}` and
//! `{{diagnostics}}`. Anything else between braces is left untouched so
//! instructions can contain literal JavaScript or CSS.

pub const PROMPT: &str = "{{prompt}}";
pub const INPUT: &str = "{{input}}";
pub const DIAGNOSTICS: &str = "{{diagnostics}}";

/// Values substituted into an instruction template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateVars<'a> {
    pub prompt: &'a str,
    pub input: Option<&'a str>,
    pub diagnostics: Option<&'a str>,
}

impl<'a> TemplateVars<'a> {
    #[must_use]
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: Option<&'a str>) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: &'a str) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }
}

/// True if `template` inlines the previous stage's output.
#[must_use]
pub fn references_input(template: &str) -> bool {
    template.contains(INPUT)
}

/// Substitute every known placeholder. Missing values render as empty.
///
/// Substitution is single-pass: a value that itself contains `{{prompt}}`
/// is not expanded again.
#[must_use]
pub fn render(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut out = String::with_capacity(template.len() + vars.prompt.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let (value, len) = if tail.starts_with(PROMPT) {
            (Some(vars.prompt), PROMPT.len())
        } else if tail.starts_with(INPUT) {
            (Some(vars.input.unwrap_or_default()), INPUT.len())
        } else if tail.starts_with(DIAGNOSTICS) {
            (Some(vars.diagnostics.unwrap_or_default()), DIAGNOSTICS.len())
        } else {
            (None, 2)
        };
        match value {
            Some(value) => out.push_str(value),
            None => out.push_str("{{"),
        }
        rest = &tail[len..];
    }
    out.push_str(rest);
    out
}
