//! LLM and cross-encoder adapters backed by a configured external program.
//!
//! The prompt (or a JSON array of `[query, text]` pairs) goes to the
//! program's stdin; its stdout is the response.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use rankfuse_hybrid::{CrossEncoder, LlmClient};

#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    /// `argv` is `[program, args...]`.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().context("external command is empty")?;
        Ok(Self { program: program.clone(), args: args.to_vec() })
    }

    pub fn run(&self, input: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.program))?;

        let mut stdin = child.stdin.take().context("child stdin unavailable")?;
        let payload = input.to_string();
        // stdin is written from a thread while stdout drains
        let writer = thread::spawn(move || stdin.write_all(payload.as_bytes()));

        let output = child.wait_with_output().with_context(|| format!("'{}' did not finish", self.program))?;
        match writer.join() {
            Ok(res) => res.with_context(|| format!("writing to '{}'", self.program))?,
            Err(_) => bail!("stdin writer for '{}' panicked", self.program),
        }
        if !output.status.success() {
            bail!("'{}' exited with {}", self.program, output.status);
        }
        let text = String::from_utf8(output.stdout).context("response is not UTF-8")?;
        tracing::debug!(program = %self.program, bytes = text.len(), "external command answered");
        Ok(text)
    }
}

impl LlmClient for ExternalCommand {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.run(prompt)
    }
}

impl CrossEncoder for ExternalCommand {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
        let request = serde_json::to_string(pairs)?;
        let raw = self.run(&request)?;
        let scores: Vec<f64> = serde_json::from_str(raw.trim()).context("cross-encoder output is not a JSON list of numbers")?;
        Ok(scores)
    }
}
