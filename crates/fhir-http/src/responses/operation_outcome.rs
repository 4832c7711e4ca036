//! OperationOutcome generation.
//!
//! Every error the adapter renders is an OperationOutcome resource built
//! here.

use serde_json::{Value, json};

use crate::fhir_types::Resource;

/// Issue severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Fatal error - processing cannot continue.
    Fatal,
    /// Error - processing has failed.
    Error,
    /// Warning - processing succeeded but with concerns.
    Warning,
    /// Information - informational message.
    Information,
}

impl IssueSeverity {
    /// Returns the FHIR string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        }
    }
}

/// Issue type codes used by the HTTP adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    /// Invalid content.
    Invalid,
    /// Resource not found.
    NotFound,
    /// Resource was deleted.
    Deleted,
    /// Conflict with existing state.
    Conflict,
    /// Not supported.
    NotSupported,
    /// Processing error.
    Processing,
    /// Request exceeded a size limit.
    TooCostly,
    /// Request did not complete in time.
    Timeout,
    /// Unexpected internal failure.
    Exception,
    /// Informational message.
    Informational,
}

impl IssueType {
    /// Returns the FHIR code string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Invalid => "invalid",
            IssueType::NotFound => "not-found",
            IssueType::Deleted => "deleted",
            IssueType::Conflict => "conflict",
            IssueType::NotSupported => "not-supported",
            IssueType::Processing => "processing",
            IssueType::TooCostly => "too-costly",
            IssueType::Timeout => "timeout",
            IssueType::Exception => "exception",
            IssueType::Informational => "informational",
        }
    }
}

/// An issue in an OperationOutcome.
#[derive(Debug, Clone)]
pub struct Issue {
    /// The severity of the issue.
    pub severity: IssueSeverity,
    /// The type/code of the issue.
    pub code: IssueType,
    /// Human-readable description.
    pub details: String,
}

impl Issue {
    /// Creates a new issue.
    pub fn new(severity: IssueSeverity, code: IssueType, details: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            details: details.into(),
        }
    }

    /// Creates an error issue.
    pub fn error(code: IssueType, details: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, details)
    }

    /// Converts to FHIR JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "severity": self.severity.as_str(),
            "code": self.code.as_str(),
            "details": {
                "text": self.details
            }
        })
    }
}

/// Builder for OperationOutcome resources.
#[derive(Debug, Default)]
pub struct OperationOutcomeBuilder {
    issues: Vec<Issue>,
}

impl OperationOutcomeBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an issue.
    pub fn add_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Adds an error issue.
    pub fn error(self, code: IssueType, details: impl Into<String>) -> Self {
        self.add_issue(Issue::error(code, details))
    }

    /// Builds the OperationOutcome resource.
    pub fn build(self) -> Resource {
        let issues: Vec<Value> = self.issues.iter().map(Issue::to_json).collect();

        Resource::new(json!({
            "resourceType": "OperationOutcome",
            "issue": issues
        }))
    }
}

/// Creates a single-issue error OperationOutcome.
pub fn error_outcome(code: IssueType, message: &str) -> Resource {
    OperationOutcomeBuilder::new().error(code, message).build()
}
