use serde::Serialize;

use switchboard_platforms::PlatformType;

/// Outcome of one forward leg.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    pub platform: PlatformType,
    pub instance_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetResult {
    pub fn ok(platform: PlatformType, instance_id: impl Into<String>) -> Self {
        Self {
            platform,
            instance_id: instance_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        platform: PlatformType,
        instance_id: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            platform,
            instance_id: instance_id.into(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregate outcome of routing one canonical message.
///
/// `success` means the webhook was handled: either at least one leg
/// delivered, or there was nothing to deliver. A no-route condition is not
/// an error.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingOutcome {
    pub success: bool,
    pub forwarded: bool,
    pub results: Vec<TargetResult>,
}

impl RoutingOutcome {
    /// Nothing to do: unroutable event, guard rejection, or no mapping.
    pub fn no_op() -> Self {
        Self {
            success: true,
            forwarded: false,
            results: Vec::new(),
        }
    }

    pub fn from_results(results: Vec<TargetResult>) -> Self {
        let forwarded = results.iter().any(|r| r.success);
        Self {
            success: results.is_empty() || forwarded,
            forwarded,
            results,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_are_success_without_forward() {
        let outcome = RoutingOutcome::from_results(Vec::new());
        assert!(outcome.success);
        assert!(!outcome.forwarded);
    }

    #[test]
    fn one_success_carries_the_outcome() {
        let outcome = RoutingOutcome::from_results(vec![
            TargetResult::failed(PlatformType::Chatwoot, "desk-1", "boom"),
            TargetResult::ok(PlatformType::Dify, "ai-1"),
        ]);
        assert!(outcome.success);
        assert!(outcome.forwarded);
    }

    #[test]
    fn all_failures_fail_the_outcome() {
        let outcome = RoutingOutcome::from_results(vec![TargetResult::failed(
            PlatformType::Chatwoot,
            "desk-1",
            "boom",
        )]);
        assert!(!outcome.success);
        assert!(!outcome.forwarded);
    }
}
