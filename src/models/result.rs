use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ResourceKind;
use crate::errors::AppResult;
use crate::gateway::ProjectResource;
use crate::utils::{require_text, utc_now};

/// A recorded outcome of a project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProjectResult {
    pub id: Uuid,
    pub project_id: Uuid,
    #[schema(example = "Pilot shipped to two regions")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResultCreateRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ResultUpdateRequest {
    pub text: Option<String>,
}

#[async_trait]
impl ProjectResource for ProjectResult {
    const KIND: ResourceKind = ResourceKind::Result;
    const TABLE: &'static str = "results";
    const COLUMNS: &'static str = "id, project_id, text, created_at";

    type Row = ProjectResult;
    type Create = ResultCreateRequest;
    type Update = ResultUpdateRequest;

    fn from_row(row: Self::Row) -> AppResult<Self> {
        Ok(row)
    }

    fn build(project_id: Uuid, payload: Self::Create) -> AppResult<Self> {
        require_text("text", &payload.text, None)?;
        Ok(ProjectResult {
            id: Uuid::new_v4(),
            project_id,
            text: payload.text,
            created_at: utc_now(),
        })
    }

    fn apply(&mut self, payload: Self::Update) -> AppResult<()> {
        if let Some(text) = payload.text {
            require_text("text", &text, None)?;
            self.text = text;
        }
        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO results (id, project_id, text, created_at) VALUES (?, ?, ?, ?)")
            .bind(self.id)
            .bind(self.project_id)
            .bind(&self.text)
            .bind(self.created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn save(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE results SET text = ? WHERE id = ? AND project_id = ?")
            .bind(&self.text)
            .bind(self.id)
            .bind(self.project_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
