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

pub const NAME_MAX: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Risk {
    pub id: Uuid,
    pub project_id: Uuid,
    #[schema(example = "Supplier delay")]
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RiskCreateRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RiskUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Risk {
    fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name, Some(NAME_MAX))?;
        require_text("description", &self.description, None)
    }
}

#[async_trait]
impl ProjectResource for Risk {
    const KIND: ResourceKind = ResourceKind::Risk;
    const TABLE: &'static str = "risks";
    const COLUMNS: &'static str = "id, project_id, name, description, created_at";

    type Row = Risk;
    type Create = RiskCreateRequest;
    type Update = RiskUpdateRequest;

    fn from_row(row: Self::Row) -> AppResult<Self> {
        Ok(row)
    }

    fn build(project_id: Uuid, payload: Self::Create) -> AppResult<Self> {
        let risk = Risk {
            id: Uuid::new_v4(),
            project_id,
            name: payload.name,
            description: payload.description,
            created_at: utc_now(),
        };
        risk.validate()?;
        Ok(risk)
    }

    fn apply(&mut self, payload: Self::Update) -> AppResult<()> {
        if let Some(name) = payload.name {
            self.name = name;
        }
        if let Some(description) = payload.description {
            self.description = description;
        }
        self.validate()
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO risks (id, project_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(self.id)
            .bind(self.project_id)
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.created_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn save(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE risks SET name = ?, description = ? WHERE id = ? AND project_id = ?")
            .bind(&self.name)
            .bind(&self.description)
            .bind(self.id)
            .bind(self.project_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn description_is_required() {
        let err = Risk::build(
            Uuid::new_v4(),
            RiskCreateRequest {
                name: "Supplier delay".to_string(),
                description: "".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "description"));
    }
}
