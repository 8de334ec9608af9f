//! Job state tracking for the pipeline orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::spec::ProcessingSpec;

/// Pipeline stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Probing,
    Planning,
    Trimming,
    Compositing,
    Watermarking,
    Concatenating,
    Encoding,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Probing => "probing",
            Stage::Planning => "planning",
            Stage::Trimming => "trimming",
            Stage::Compositing => "compositing",
            Stage::Watermarking => "watermarking",
            Stage::Concatenating => "concatenating",
            Stage::Encoding => "encoding",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but not yet started
    #[default]
    Pending,
    /// Actively running pipeline stages
    Running,
    /// Finished, final artifact available
    Succeeded,
    /// Terminal failure, all artifacts purged
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One processing job: the immutable spec plus mutable progress state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: String,
    /// The request this job executes; immutable for the job's lifetime
    pub spec: ProcessingSpec,
    /// Stage currently (or last) executed
    pub stage: Option<Stage>,
    /// Current status
    pub status: JobStatus,
    /// Intermediate artifacts created so far, in creation order
    pub temp_artifacts: Vec<PathBuf>,
    /// Error message if the job failed
    pub error_message: Option<String>,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the state last changed
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job for a spec.
    pub fn new(spec: ProcessingSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            spec,
            stage: None,
            status: JobStatus::Pending,
            temp_artifacts: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record entry into a stage, moving the job to Running.
    pub fn enter_stage(&mut self, stage: Stage) {
        self.stage = Some(stage);
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
    }

    /// Record an intermediate artifact produced by the current stage.
    pub fn record_artifact(&mut self, path: PathBuf) {
        self.temp_artifacts.push(path);
        self.updated_at = Utc::now();
    }

    /// Mark the job as succeeded.
    pub fn succeed(&mut self) {
        self.status = JobStatus::Succeeded;
        self.updated_at = Utc::now();
    }

    /// Mark the job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let mut job = Job::new(ProcessingSpec::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.stage.is_none());

        job.enter_stage(Stage::Probing);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.stage, Some(Stage::Probing));

        job.record_artifact(PathBuf::from("/tmp/x/trimmed.mp4"));
        assert_eq!(job.temp_artifacts.len(), 1);

        job.succeed();
        assert!(job.status.is_terminal());
    }

    #[test]
    fn test_job_failure() {
        let mut job = Job::new(ProcessingSpec::default());
        job.enter_stage(Stage::Encoding);
        job.fail("encoder exited with status 1");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.status.is_terminal());
        assert!(job.error_message.as_deref().unwrap().contains("encoder"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Compositing.to_string(), "compositing");
        assert_eq!(JobStatus::Succeeded.to_string(), "succeeded");
    }
}
