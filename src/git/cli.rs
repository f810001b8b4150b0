//! Git CLI backend
//!
//! Runs the `git` executable for every query. Each invocation is bounded by
//! the configured timeout and the child is killed when the future is dropped.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::provider::ChangeSetProvider;
use super::types::{FileChange, parse_name_status};
use crate::config::GitConfig;
use crate::types::{Result, SyncError};

pub struct GitCli {
    repo: PathBuf,
    binary: String,
    timeout: Duration,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>, config: &GitConfig) -> Self {
        Self {
            repo: repo.into(),
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    /// Spawn git and wait for it within the timeout, whatever the exit status
    async fn exec(&self, args: &[String]) -> Result<Output> {
        let label = args.first().map(String::as_str).unwrap_or_default();
        debug!("git {}", args.join(" "));

        let child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.repo)
            .env("LC_ALL", "C")
            .env("GIT_PAGER", "cat")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SyncError::git(label, format!("failed to spawn '{}': {}", self.binary, e))
            })?;

        timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SyncError::timeout(format!("git {}", label), self.timeout))?
            .map_err(|e| SyncError::git(label, e.to_string()))
    }

    /// Run git and return stdout, failing on a non-zero exit
    async fn run(&self, args: Vec<String>) -> Result<String> {
        let output = self.exec(&args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(SyncError::git(args.join(" "), message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn diff_args(context_lines: u32) -> Vec<String> {
        vec![
            "diff".to_string(),
            "--patch".to_string(),
            "--no-color".to_string(),
            "--no-ext-diff".to_string(),
            "--find-renames".to_string(),
            format!("--unified={}", context_lines),
        ]
    }

    fn with_paths(mut args: Vec<String>, paths: &[String]) -> Vec<String> {
        if !paths.is_empty() {
            args.push("--".to_string());
            args.extend(paths.iter().cloned());
        }
        args
    }
}

#[async_trait]
impl ChangeSetProvider for GitCli {
    async fn resolve(&self, reference: &str) -> Result<String> {
        let out = self
            .run(vec![
                "rev-parse".to_string(),
                "--verify".to_string(),
                "--quiet".to_string(),
                format!("{}^{{commit}}", reference),
            ])
            .await
            .map_err(|e| match e {
                SyncError::Git { .. } => SyncError::git(
                    "rev-parse",
                    format!("cannot resolve '{}' to a commit", reference),
                ),
                other => other,
            })?;
        Ok(out.trim().to_string())
    }

    async fn merge_base(&self, a: &str, b: &str) -> Result<String> {
        let out = self
            .run(vec!["merge-base".to_string(), a.to_string(), b.to_string()])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn changed_files(
        &self,
        base: &str,
        target: &str,
        paths: &[String],
    ) -> Result<Vec<FileChange>> {
        let args = Self::with_paths(
            vec![
                "diff".to_string(),
                "--name-status".to_string(),
                "-z".to_string(),
                "--find-renames".to_string(),
                base.to_string(),
                target.to_string(),
            ],
            paths,
        );
        parse_name_status(&self.run(args).await?)
    }

    async fn patch(
        &self,
        base: &str,
        target: &str,
        paths: &[String],
        context_lines: u32,
    ) -> Result<String> {
        let mut args = Self::diff_args(context_lines);
        args.push(base.to_string());
        args.push(target.to_string());
        self.run(Self::with_paths(args, paths)).await
    }

    async fn file_size_at(&self, commit: &str, path: &str) -> Result<Option<u64>> {
        let output = self
            .exec(&[
                "cat-file".to_string(),
                "-s".to_string(),
                format!("{}:{}", commit, path),
            ])
            .await?;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().parse().ok())
    }

    async fn working_tree_patch(
        &self,
        paths: &[String],
        context_lines: u32,
        staged: bool,
    ) -> Result<String> {
        let mut args = Self::diff_args(context_lines);
        if staged {
            args.push("--cached".to_string());
        }
        self.run(Self::with_paths(args, paths)).await
    }
}
