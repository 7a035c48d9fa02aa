//! Compiler service seam and the subprocess implementation.
//!
//! # Protocol
//! ```text
//! stdin   {"handlers":[{"name","path"}],"env":{..},"emit_config":true,"import_map_paths":[..]}
//! stdout  {"function_config":[{..}|null, ..],"graph":{"modules":[..]},"success":true,
//!          "npm_specifiers_with_extraneous_files":[..]}
//! ```
//! `function_config` is positional over `handlers`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::declarations::{FunctionConfig, HandlerSource};
use crate::error::BuildError;
use crate::graph::ModuleGraph;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Ask the compiler to evaluate each handler's exported config.
    pub emit_config: bool,
    pub import_map_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOutput {
    /// One entry per input handler, in input order.
    pub function_config: Vec<FunctionConfig>,
    pub graph: Option<ModuleGraph>,
    pub success: bool,
    /// npm packages the compiler bundled with files it may not support.
    pub npm_specifiers_with_extraneous_files: Vec<String>,
}

/// Turns handler sources into executable artifacts plus a module graph.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `handlers`. Output configs must preserve input order.
    async fn compile(
        &self,
        handlers: &[HandlerSource],
        env: &BTreeMap<String, String>,
        opts: &CompileOptions,
    ) -> Result<CompileOutput, BuildError>;
}

#[derive(Serialize)]
struct CompileRequest<'a> {
    handlers: Vec<HandlerRef<'a>>,
    env: &'a BTreeMap<String, String>,
    emit_config: bool,
    import_map_paths: &'a [PathBuf],
}

#[derive(Serialize)]
struct HandlerRef<'a> {
    name: &'a str,
    path: &'a Path,
}

#[derive(Deserialize)]
struct CompileResponse {
    #[serde(default)]
    function_config: Vec<Option<FunctionConfig>>,
    #[serde(default)]
    graph: Option<ModuleGraph>,
    success: bool,
    #[serde(default)]
    npm_specifiers_with_extraneous_files: Vec<String>,
}

/// Runs an external command per build and speaks JSON over stdio.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    command: Vec<String>,
    cwd: PathBuf,
    timeout: Duration,
}

impl ProcessCompiler {
    pub fn new(command: Vec<String>, cwd: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command,
            cwd: cwd.into(),
            timeout,
        }
    }

    fn request_body(
        handlers: &[HandlerSource],
        env: &BTreeMap<String, String>,
        opts: &CompileOptions,
    ) -> Result<Vec<u8>, BuildError> {
        let request = CompileRequest {
            handlers: handlers
                .iter()
                .map(|h| HandlerRef {
                    name: &h.name,
                    path: &h.path,
                })
                .collect(),
            env,
            emit_config: opts.emit_config,
            import_map_paths: &opts.import_map_paths,
        };
        Ok(serde_json::to_vec(&request)?)
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile(
        &self,
        handlers: &[HandlerSource],
        env: &BTreeMap<String, String>,
        opts: &CompileOptions,
    ) -> Result<CompileOutput, BuildError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(BuildError::CompilerUnavailable(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "compiler command is empty",
            )));
        };
        let body = Self::request_body(handlers, env, opts)?;

        tracing::debug!(program = %program, handlers = handlers.len(), "Spawning edge function compiler");

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(BuildError::CompilerUnavailable)?;

        let stdin = child.stdin.take();
        let run = async move {
            let write = async move {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(&body).await?;
                    stdin.shutdown().await?;
                }
                Ok::<_, std::io::Error>(())
            };
            let (written, output) = tokio::join!(write, child.wait_with_output());
            let output = output?;
            // A compiler that exits without reading stdin reports through its status.
            if let Err(e) = written {
                tracing::debug!(error = %e, "Compiler closed stdin early");
            }
            Ok::<_, std::io::Error>(output)
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| BuildError::Timeout(self.timeout))?
            .map_err(BuildError::CompilerUnavailable)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("compiler exited with {}", output.status),
                text => text.to_string(),
            };
            return Err(BuildError::Compile(message));
        }

        let response: CompileResponse = serde_json::from_slice(&output.stdout)?;
        Ok(CompileOutput {
            function_config: response
                .function_config
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            graph: response.graph,
            success: response.success,
            npm_specifiers_with_extraneous_files: response.npm_specifiers_with_extraneous_files,
        })
    }
}
