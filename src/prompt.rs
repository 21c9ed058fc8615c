//! Operator prompt acquisition.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use boidfactory_utils::BoidfactoryError;

use crate::cli::RunArgs;

/// Editor used by `--edit` when neither `VISUAL` nor `EDITOR` is set.
pub const DEFAULT_EDITOR: &str = "vi";

/// Where the operator prompt comes from. Exactly one source is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Inline(String),
    File(PathBuf),
    Editor,
}

impl PromptSource {
    pub fn from_args(args: &RunArgs) -> Result<Self, BoidfactoryError> {
        match (&args.prompt, &args.prompt_file, args.edit) {
            (Some(text), None, false) => Ok(Self::Inline(text.clone())),
            (None, Some(path), false) => Ok(Self::File(path.clone())),
            (None, None, true) => Ok(Self::Editor),
            (None, None, false) => Err(BoidfactoryError::Prompt {
                reason: "no prompt given; use --prompt, --prompt-file, or --edit".to_string(),
            }),
            _ => Err(BoidfactoryError::Prompt {
                reason: "--prompt, --prompt-file and --edit are mutually exclusive".to_string(),
            }),
        }
    }

    /// Read the prompt. Blank prompts are rejected.
    pub fn read(&self) -> Result<String, BoidfactoryError> {
        let text = match self {
            Self::Inline(text) => text.clone(),
            Self::File(path) => fs::read_to_string(path).map_err(|e| BoidfactoryError::Prompt {
                reason: format!("cannot read prompt file {}: {e}", path.display()),
            })?,
            Self::Editor => edit_prompt(&editor_from(&|key: &str| std::env::var(key).ok()))?,
        };
        if text.trim().is_empty() {
            return Err(BoidfactoryError::Prompt {
                reason: "prompt is empty".to_string(),
            });
        }
        Ok(text)
    }
}

/// `VISUAL`, then `EDITOR`, then [`DEFAULT_EDITOR`].
fn editor_from(env: &dyn Fn(&str) -> Option<String>) -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|key| env(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

fn edit_prompt(editor: &str) -> Result<String, BoidfactoryError> {
    let mut words = editor.split_whitespace();
    let program = words.next().unwrap_or(DEFAULT_EDITOR);

    let file = tempfile::Builder::new()
        .prefix("boidfactory-prompt-")
        .suffix(".md")
        .tempfile()?;
    tracing::debug!(editor, path = %file.path().display(), "opening editor for prompt");

    let status = Command::new(program)
        .args(words)
        .arg(file.path())
        .status()
        .map_err(|e| BoidfactoryError::Prompt {
            reason: format!("cannot start editor '{program}': {e}"),
        })?;
    if !status.success() {
        return Err(BoidfactoryError::Prompt {
            reason: format!("editor '{program}' exited with {status}"),
        });
    }
    Ok(fs::read_to_string(file.path())?)
}
