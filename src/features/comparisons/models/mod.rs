mod comparison;
mod issue;

pub use comparison::{AiComparison, ComparisonStatus, RunClaim};
pub use issue::{
    AiIssue, ChangeType, Classification, IssueAssessment, IssueSeverity, OwnerDecision,
};
