use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::bearer_token;
use crate::models::user::AccountFlags;

/// The authenticated caller together with its account flags, loaded fresh
/// from the store for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub flags: AccountFlags,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            flags: AccountFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: AccountFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_manager(&self) -> bool {
        self.flags.is_manager
    }

    pub fn is_leader(&self) -> bool {
        self.flags.is_leader
    }

    pub async fn load<'e, E>(executor: E, user_id: Uuid) -> AppResult<Option<Self>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        #[derive(FromRow)]
        struct FlagsRow {
            is_manager: bool,
            is_leader: bool,
            is_participant: bool,
        }

        let row = sqlx::query_as::<_, FlagsRow>(
            "SELECT is_manager, is_leader, is_participant FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|row| {
            Principal::new(user_id).with_flags(AccountFlags {
                is_manager: row.is_manager,
                is_leader: row.is_leader,
                is_participant: row.is_participant,
            })
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.jwt.decode(token)?;

        Principal::load(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("account no longer exists"))
    }
}
