use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::AccountFlags;

/// Role a user holds on one specific project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum MembershipRole {
    Leader,
    Participant,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Leader => "leader",
            MembershipRole::Participant => "participant",
        }
    }

    /// Whether an account with `flags` may be given this role at all.
    pub fn admits(&self, flags: &AccountFlags) -> bool {
        match self {
            MembershipRole::Leader => flags.is_leader,
            MembershipRole::Participant => flags.is_participant || flags.is_leader,
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MEMBERSHIP_COLUMNS: &str = "id, project_id, user_id, role, date_added";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub date_added: DateTime<Utc>,
}

impl Membership {
    pub fn new(project_id: Uuid, user_id: Uuid, role: MembershipRole, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            role,
            date_added: now,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MembershipCreateRequest {
    pub user_id: Uuid,
    #[schema(example = "participant")]
    pub role: MembershipRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MembershipUpdateRequest {
    #[schema(example = "leader")]
    pub role: MembershipRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_role_needs_leader_capability() {
        let participant_only = AccountFlags {
            is_participant: true,
            ..Default::default()
        };
        let leader = AccountFlags {
            is_leader: true,
            ..Default::default()
        };
        let manager_only = AccountFlags {
            is_manager: true,
            ..Default::default()
        };

        assert!(!MembershipRole::Leader.admits(&participant_only));
        assert!(MembershipRole::Leader.admits(&leader));
        assert!(MembershipRole::Participant.admits(&participant_only));
        assert!(MembershipRole::Participant.admits(&leader));
        assert!(!MembershipRole::Participant.admits(&manager_only));
    }

    #[test]
    fn role_uses_snake_case_on_the_wire() {
        let role: MembershipRole = serde_json::from_str("\"participant\"").expect("parse");
        assert_eq!(role, MembershipRole::Participant);
        assert!(serde_json::from_str::<MembershipRole>("\"owner\"").is_err());
    }
}
