//! Authorization module - project membership policy
//!
//! Access to a project and everything it owns is decided from two separate
//! sources of truth:
//! - account flags on the user (`is_manager`, `is_leader`, `is_participant`)
//! - the per-project membership relation with its `leader` / `participant` role
//!
//! Managers may read every project. Only a `leader` membership grants writes.
//! Creating a project needs the global `is_leader` capability and grants the
//! creator a `leader` membership on the new project.

mod access;
mod evaluator;
mod principal;
mod resolver;

pub use access::ProjectAccess;
pub use evaluator::{Decision, DefaultPolicyEvaluator, DenyReason, Grant, PolicyEvaluator};
pub use principal::Principal;
pub use resolver::{MembershipResolver, SqliteMembershipResolver};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Action::Read)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that is guarded by project membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Membership,
    Task,
    Budget,
    Risk,
    Result,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Project,
        ResourceKind::Membership,
        ResourceKind::Task,
        ResourceKind::Budget,
        ResourceKind::Risk,
        ResourceKind::Result,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "project",
            ResourceKind::Membership => "membership",
            ResourceKind::Task => "task",
            ResourceKind::Budget => "budget",
            ResourceKind::Risk => "risk",
            ResourceKind::Result => "result",
        }
    }

    /// Path segment used for the kind's collection under a project.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Membership => "members",
            ResourceKind::Task => "tasks",
            ResourceKind::Budget => "budgets",
            ResourceKind::Risk => "risks",
            ResourceKind::Result => "results",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
