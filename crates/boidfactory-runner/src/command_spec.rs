use std::ffi::OsString;
use std::process::Command;

/// Specification for a command to execute.
///
/// Arguments are `Vec<OsString>`, never a shell string. Optional stdin bytes
/// are delivered through a pipe that is closed once fully written, so a
/// generator reading "optional piped input" sees EOF as the end of the prior
/// stage's output.
///
/// ```rust
/// use boidfactory_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("ollama")
///     .args(["run", "--hidethinking"])
///     .arg("qwen3:8b")
///     .arg("Write a spec")
///     .stdin("prior stage output");
///
/// assert_eq!(cmd.program, OsString::from("ollama"));
/// assert_eq!(cmd.args.len(), 4);
/// assert!(cmd.stdin.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Bytes written to the child's stdin. `None` attaches stdin to null.
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pipe `input` to the child's stdin.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Human-readable rendering for logs. Not a shell command line.
    #[must_use]
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            let arg = arg.to_string_lossy();
            if arg.chars().count() > 48 {
                let head: String = arg.chars().take(45).collect();
                out.push_str(&format!("{head:?}..."));
            } else if arg.contains(char::is_whitespace) {
                out.push_str(&format!("{arg:?}"));
            } else {
                out.push_str(&arg);
            }
        }
        out
    }

    /// Build a `std::process::Command` using argv-style APIs only.
    ///
    /// Stdio wiring is left to the runner.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}
