use std::sync::Arc;

use uuid::Uuid;

use super::evaluator::{Decision, Grant, PolicyEvaluator};
use super::principal::Principal;
use super::resolver::MembershipResolver;
use super::{Action, ResourceKind};
use crate::errors::{AppError, AppResult};

/// Membership resolution plus policy evaluation for one project.
#[derive(Clone)]
pub struct ProjectAccess {
    resolver: Arc<dyn MembershipResolver>,
    policy: Arc<dyn PolicyEvaluator>,
}

impl ProjectAccess {
    pub fn new(resolver: Arc<dyn MembershipResolver>, policy: Arc<dyn PolicyEvaluator>) -> Self {
        Self { resolver, policy }
    }

    /// Existence of the project is checked first (`NotFound`), then the policy
    /// (`Forbidden`). Store faults surface as they are and are never reported
    /// as a denial.
    pub async fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        kind: ResourceKind,
        project_id: Uuid,
    ) -> AppResult<Grant> {
        let role = self.resolver.role_of(principal.user_id, project_id).await?;

        match self.policy.evaluate(principal, action, kind, role) {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny(reason) => {
                tracing::warn!(
                    user_id = %principal.user_id,
                    project_id = %project_id,
                    action = %action,
                    kind = %kind,
                    reason = ?reason,
                    "access denied"
                );
                Err(AppError::forbidden(reason.describe(action, kind)))
            }
        }
    }

    /// Fail-closed yes/no answer: any error while resolving yields `false`.
    pub async fn can(
        &self,
        principal: &Principal,
        action: Action,
        kind: ResourceKind,
        project_id: Uuid,
    ) -> bool {
        match self.authorize(principal, action, kind, project_id).await {
            Ok(_) => true,
            Err(AppError::Forbidden(_)) => false,
            Err(err) => {
                tracing::debug!(project_id = %project_id, error = %err, "access check failed closed");
                false
            }
        }
    }

    pub fn authorize_project_create(&self, principal: &Principal) -> AppResult<Grant> {
        match self.policy.evaluate_project_create(principal) {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny(reason) => {
                tracing::warn!(user_id = %principal.user_id, reason = ?reason, "project creation denied");
                Err(AppError::forbidden(reason.describe(Action::Create, ResourceKind::Project)))
            }
        }
    }
}
