use super::principal::Principal;
use super::{Action, ResourceKind};
use crate::models::membership::MembershipRole;

/// Why an operation was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Global read oversight of a manager.
    ManagerOversight,
    /// `leader` membership on the project.
    Leader,
    /// `participant` membership on the project (read only).
    Participant,
    /// Global `is_leader` capability, used for project creation.
    LeaderCapability,
}

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotMember,
    ReadOnlyMembership,
    MissingLeaderCapability,
}

impl DenyReason {
    pub fn describe(&self, action: Action, kind: ResourceKind) -> String {
        match self {
            DenyReason::NotMember => format!("no access to this project; cannot {action} {kind}"),
            DenyReason::ReadOnlyMembership => {
                format!("participants have read-only access; cannot {action} {kind}")
            }
            DenyReason::MissingLeaderCapability => "only leaders can create projects".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Decide `action` on `kind` inside a project where the principal holds `role`.
    fn evaluate(
        &self,
        principal: &Principal,
        action: Action,
        kind: ResourceKind,
        role: Option<MembershipRole>,
    ) -> Decision;

    /// Decide creation of a new project, which has no memberships yet.
    fn evaluate_project_create(&self, principal: &Principal) -> Decision;
}

/// Default policy evaluator.
///
/// Evaluation order:
/// 1. `leader` membership -> allow everything
/// 2. read by a manager -> allow
/// 3. read by a `participant` member -> allow
/// 4. any other write by a participant -> deny (read only)
/// 5. deny
///
/// The rule is the same for every resource kind.
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn evaluate(
        &self,
        principal: &Principal,
        action: Action,
        kind: ResourceKind,
        role: Option<MembershipRole>,
    ) -> Decision {
        let decision = match (role, action) {
            (Some(MembershipRole::Leader), _) => Decision::Allow(Grant::Leader),
            (_, Action::Read) if principal.is_manager() => Decision::Allow(Grant::ManagerOversight),
            (Some(MembershipRole::Participant), Action::Read) => Decision::Allow(Grant::Participant),
            (Some(MembershipRole::Participant), _) => Decision::Deny(DenyReason::ReadOnlyMembership),
            (None, _) => Decision::Deny(DenyReason::NotMember),
        };

        tracing::debug!(
            user_id = %principal.user_id,
            action = %action,
            kind = %kind,
            role = ?role,
            decision = ?decision,
            "policy evaluated"
        );

        decision
    }

    fn evaluate_project_create(&self, principal: &Principal) -> Decision {
        if principal.is_leader() {
            Decision::Allow(Grant::LeaderCapability)
        } else {
            Decision::Deny(DenyReason::MissingLeaderCapability)
        }
    }
}
