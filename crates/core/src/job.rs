//! Lifecycle of one reconstruction request.
//!
//! ```text
//! Received -> WorkspaceReady -> PhotosPersisted -> GraphBuilt -> PrimaryRunning
//!   PrimaryRunning -> PrimaryFailed (terminal) | PrimarySucceeded
//!   PrimarySucceeded -> OutputChecked -> NoOutput (terminal) | OutputFound
//!   OutputFound -> ConversionAttempted -> ResponseAssembled (terminal)
//! ```

use std::fmt;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    WorkspaceReady,
    PhotosPersisted,
    GraphBuilt,
    PrimaryRunning,
    PrimaryFailed,
    PrimarySucceeded,
    OutputChecked,
    NoOutput,
    OutputFound,
    ConversionAttempted,
    ResponseAssembled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::WorkspaceReady => "workspace_ready",
            Self::PhotosPersisted => "photos_persisted",
            Self::GraphBuilt => "graph_built",
            Self::PrimaryRunning => "primary_running",
            Self::PrimaryFailed => "primary_failed",
            Self::PrimarySucceeded => "primary_succeeded",
            Self::OutputChecked => "output_checked",
            Self::NoOutput => "no_output",
            Self::OutputFound => "output_found",
            Self::ConversionAttempted => "conversion_attempted",
            Self::ResponseAssembled => "response_assembled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::PrimaryFailed | Self::NoOutput | Self::ResponseAssembled
        )
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Received, WorkspaceReady)
                | (WorkspaceReady, PhotosPersisted)
                | (PhotosPersisted, GraphBuilt)
                | (GraphBuilt, PrimaryRunning)
                | (PrimaryRunning, PrimaryFailed)
                | (PrimaryRunning, PrimarySucceeded)
                | (PrimarySucceeded, OutputChecked)
                | (OutputChecked, NoOutput)
                | (OutputChecked, OutputFound)
                | (OutputFound, ConversionAttempted)
                | (ConversionAttempted, ResponseAssembled)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered record of the states a request has passed through.
#[derive(Debug, Clone)]
pub struct JobTimeline {
    states: Vec<JobState>,
}

impl Default for JobTimeline {
    fn default() -> Self {
        Self {
            states: vec![JobState::Received],
        }
    }
}

impl JobTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> JobState {
        // Never empty: construction seeds `Received`.
        self.states[self.states.len() - 1]
    }

    pub fn states(&self) -> &[JobState] {
        &self.states
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn advance(&mut self, next: JobState) -> Result<(), CoreError> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(CoreError::Internal(format!(
                "invalid job transition {current} -> {next}"
            )));
        }
        self.states.push(next);
        Ok(())
    }
}
