//! Ordered stage chains.
//!
//! Stage `i + 1` consumes the output of stage `i`. Execution is a left fold
//! over the stages, so running `[a, b, c]` gives the same final output as
//! running `[a, b]` and seeding `[c]` with its result.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use boidfactory_config::StageConfig;
use thiserror::Error;

use crate::generator::{GenerationRequest, Generator, GeneratorError};
use crate::stage::Stage;

/// Per-job values every stage invocation shares.
#[derive(Debug, Clone, Copy)]
pub struct ChainContext<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub thinking: bool,
    pub stage_timeout: Duration,
}

/// Text produced by one completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub stage: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutput {
    /// One entry per stage, in chain order. Never empty.
    pub outputs: Vec<StageOutput>,
}

impl ChainOutput {
    /// Output of the last stage.
    #[must_use]
    pub fn final_text(&self) -> &str {
        self.outputs.last().map_or("", |o| o.text.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("a stage chain needs at least one stage")]
    Empty,

    #[error("stage '{stage}' (#{}) failed: {source}", .index + 1)]
    StageFailed {
        stage: String,
        index: usize,
        #[source]
        source: GeneratorError,
        /// Outputs of the stages that finished before the failure.
        completed: Vec<StageOutput>,
    },

    #[error("could not open output for stage '{stage}': {source}")]
    Sink {
        stage: String,
        #[source]
        source: io::Error,
    },
}

impl ChainError {
    /// Name of the stage the chain stopped at, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::StageFailed { stage, .. } | Self::Sink { stage, .. } => Some(stage),
        }
    }
}

/// Where each stage's output streams while it is generated.
pub trait StageSinks {
    fn sink_for(&mut self, index: usize, stage: &Stage) -> io::Result<Box<dyn Write>>;
}

/// Drops streamed output. Stage results are still returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSinks;

impl StageSinks for DiscardSinks {
    fn sink_for(&mut self, _index: usize, _stage: &Stage) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(io::sink()))
    }
}

/// A non-empty ordered list of stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChain {
    stages: Vec<Stage>,
}

impl StageChain {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ChainError> {
        if stages.is_empty() {
            return Err(ChainError::Empty);
        }
        Ok(Self { stages })
    }

    pub fn from_configs(configs: &[StageConfig]) -> Result<Self, ChainError> {
        Self::new(configs.iter().map(Stage::from).collect())
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[must_use]
    pub fn final_stage(&self) -> &Stage {
        // Non-empty by construction.
        &self.stages[self.stages.len() - 1]
    }

    /// Run every stage in order.
    ///
    /// `seed_input` is handed to the first stage as if a previous stage had
    /// produced it. Any stage failure stops the chain; the stages that
    /// already finished are returned inside the error.
    pub fn execute(
        &self,
        generator: &dyn Generator,
        ctx: &ChainContext<'_>,
        seed_input: Option<&str>,
        sinks: &mut dyn StageSinks,
    ) -> Result<ChainOutput, ChainError> {
        let mut outputs: Vec<StageOutput> = Vec::with_capacity(self.stages.len());
        let mut carried: Option<String> = seed_input.map(str::to_string);

        for (index, stage) in self.stages.iter().enumerate() {
            let composed = stage.compose(ctx.prompt, carried.as_deref());
            let request = GenerationRequest {
                model: ctx.model,
                instruction: &composed.instruction,
                input: composed.stdin.as_deref(),
                thinking: ctx.thinking,
                timeout: ctx.stage_timeout,
            };

            let mut sink = sinks.sink_for(index, stage).map_err(|source| ChainError::Sink {
                stage: stage.name().to_string(),
                source,
            })?;

            let started = Instant::now();
            let result = generator.generate(&request, &mut sink);
            // Flush failures on the stream do not invalidate the captured text.
            let _ = sink.flush();

            match result {
                Ok(text) => {
                    tracing::debug!(
                        model = ctx.model,
                        stage = stage.name(),
                        bytes = text.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "stage finished"
                    );
                    outputs.push(StageOutput {
                        stage: stage.name().to_string(),
                        text: text.clone(),
                    });
                    carried = Some(text);
                }
                Err(source) => {
                    return Err(ChainError::StageFailed {
                        stage: stage.name().to_string(),
                        index,
                        source,
                        completed: outputs,
                    });
                }
            }
        }

        Ok(ChainOutput { outputs })
    }
}
