//! Shared fakes for engine integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use boidfactory_config::{Config, PipelineConfig, PipelinePreset};
use boidfactory_engine::{GenerationRequest, Generator, GeneratorError};
use camino::Utf8PathBuf;

pub const HTML: &str = "<!DOCTYPE html>\n<html><body><canvas id=\"flock\"></canvas></body>\n</html>";

/// Generator that sleeps, tracks how many calls overlap, and optionally
/// fails its `fail_on_call`-th implementation call (1-based).
pub struct FakeGenerator {
    pub delay: Duration,
    pub fail_on_call: Option<usize>,
    active: AtomicUsize,
    peak: AtomicUsize,
    implementation_calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_on_call: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            implementation_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Generator for FakeGenerator {
    fn generate(
        &self,
        request: &GenerationRequest<'_>,
        sink: &mut dyn Write,
    ) -> Result<String, GeneratorError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);

        let result = if request.input.is_some() {
            let call = self.implementation_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                Err(GeneratorError::NonZeroExit {
                    code: Some(1),
                    stderr: "out of memory".to_string(),
                })
            } else {
                Ok(format!("Sure! Here is the page for {}:\n```html\n{HTML}\n```\n", request.model))
            }
        } else {
            Ok(format!("# Spec\n\nFlocking simulation for {}.\n", request.model))
        };

        if let Ok(text) = &result {
            sink.write_all(text.as_bytes())
                .map_err(|e| GeneratorError::Sink(e.to_string()))?;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn utf8_dir(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("run")).unwrap()
}

pub fn pipeline(out_dir: &Utf8PathBuf, models: &[&str], times: u32, parallelism: u32) -> PipelineConfig {
    Config::builder()
        .models(models.iter().copied())
        .times(times)
        .parallelism(parallelism)
        .pipeline(PipelinePreset::Spec)
        .out_dir(out_dir.as_std_path())
        .build()
        .unwrap()
        .pipeline("a flock of boids")
        .unwrap()
}
