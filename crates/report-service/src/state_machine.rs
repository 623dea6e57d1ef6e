//! `ai_analysis_status` state machine (spec.md §4.5).

use domain_model::event::AiAnalysisStatus;

/// Decides the initial status on report creation.
pub fn initial_status(is_user_report: bool, has_description_or_image: bool, quota_ok: bool) -> AiAnalysisStatus {
    if is_user_report && has_description_or_image && quota_ok {
        AiAnalysisStatus::Pending
    } else {
        AiAnalysisStatus::NotApplicable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceIdempotentResult {
    /// Terminal state reached already; caller should return 200 with no
    /// score change.
    AlreadyCompleted,
    /// Terminal failure state; caller should return 429.
    AlreadyFailed,
    /// Enhancement is in flight; caller should return 202.
    AlreadyProcessing,
    /// Report never qualified for AI enhancement; caller should return 409.
    NotApplicable,
}

/// Attempts the `pending -> processing` transition. Terminal states are
/// idempotent per spec.md §4.5 and reported back rather than erroring.
pub fn begin_processing(status: AiAnalysisStatus) -> Result<AiAnalysisStatus, EnhanceIdempotentResult> {
    match status {
        AiAnalysisStatus::Pending => Ok(AiAnalysisStatus::Processing),
        AiAnalysisStatus::Completed => Err(EnhanceIdempotentResult::AlreadyCompleted),
        AiAnalysisStatus::Failed => Err(EnhanceIdempotentResult::AlreadyFailed),
        AiAnalysisStatus::Processing => Err(EnhanceIdempotentResult::AlreadyProcessing),
        AiAnalysisStatus::NotApplicable => Err(EnhanceIdempotentResult::NotApplicable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_enhance_is_idempotent() {
        assert!(matches!(
            begin_processing(AiAnalysisStatus::Completed),
            Err(EnhanceIdempotentResult::AlreadyCompleted)
        ));
    }

    #[test]
    fn failed_enhance_is_idempotent() {
        assert!(matches!(begin_processing(AiAnalysisStatus::Failed), Err(EnhanceIdempotentResult::AlreadyFailed)));
    }

    #[test]
    fn not_applicable_enhance_is_rejected_as_conflict() {
        assert!(matches!(begin_processing(AiAnalysisStatus::NotApplicable), Err(EnhanceIdempotentResult::NotApplicable)));
    }

    #[test]
    fn pending_transitions_to_processing() {
        assert_eq!(begin_processing(AiAnalysisStatus::Pending), Ok(AiAnalysisStatus::Processing));
    }
}
