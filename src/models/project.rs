use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::utils::{check_date_range, check_optional_length, deserialize_nullable, require_text};

pub const NAME_MAX: usize = 100;
pub const CLIENT_MAX: usize = 150;
pub const CURATOR_MAX: usize = 150;

pub const PROJECT_COLUMNS: &str =
    "id, name, client, curator, purpose, description, start_date, end_date, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub client: Option<String>,
    pub curator: Option<String>,
    pub purpose: Option<String>,
    pub description: Option<String>,
    #[schema(example = "2025-01-15")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-12-20")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn build(payload: ProjectCreateRequest, now: DateTime<Utc>) -> AppResult<Self> {
        let project = Project {
            id: Uuid::new_v4(),
            name: payload.name,
            client: payload.client,
            curator: payload.curator,
            purpose: payload.purpose,
            description: payload.description,
            start_date: payload.start_date,
            end_date: payload.end_date,
            created_at: now,
            updated_at: now,
        };
        project.validate()?;
        Ok(project)
    }

    pub fn apply(&mut self, payload: ProjectUpdateRequest) -> AppResult<()> {
        let ProjectUpdateRequest {
            name,
            client,
            curator,
            purpose,
            description,
            start_date,
            end_date,
        } = payload;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(client) = client {
            self.client = client;
        }
        if let Some(curator) = curator {
            self.curator = curator;
        }
        if let Some(purpose) = purpose {
            self.purpose = purpose;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(start_date) = start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = end_date {
            self.end_date = end_date;
        }

        self.validate()
    }

    fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name, Some(NAME_MAX))?;
        check_optional_length("client", self.client.as_deref(), CLIENT_MAX)?;
        check_optional_length("curator", self.curator.as_deref(), CURATOR_MAX)?;
        check_date_range(self.start_date, self.end_date)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Regional logistics hub")]
    pub name: String,
    #[schema(example = "Ministry of Transport")]
    pub client: Option<String>,
    #[schema(example = "I. Petrova")]
    pub curator: Option<String>,
    pub purpose: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Partial update. Omitted fields are kept; an explicit `null` clears an
/// optional field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub client: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub curator: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub purpose: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<Option<NaiveDate>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn request(name: &str) -> ProjectCreateRequest {
        ProjectCreateRequest {
            name: name.to_string(),
            client: None,
            curator: None,
            purpose: None,
            description: None,
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn build_rejects_overlong_client() {
        let mut payload = request("Hub");
        payload.client = Some("c".repeat(CLIENT_MAX + 1));
        let err = Project::build(payload, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "client"));
    }

    #[test]
    fn apply_keeps_untouched_fields() {
        let mut project = Project::build(request("Hub"), Utc::now()).expect("valid");
        project.curator = Some("curator".to_string());

        project
            .apply(ProjectUpdateRequest {
                name: Some("Renamed".to_string()),
                ..Default::default()
            })
            .expect("valid update");

        assert_eq!(project.name, "Renamed");
        assert_eq!(project.curator.as_deref(), Some("curator"));
    }

    #[test]
    fn null_clears_optional_fields() {
        let mut project = Project::build(request("Hub"), Utc::now()).expect("valid");
        project.client = Some("Ministry".to_string());
        project.end_date = NaiveDate::from_ymd_opt(2025, 12, 31);

        let payload: ProjectUpdateRequest =
            serde_json::from_str(r#"{"client":null,"end_date":null}"#).expect("valid json");
        project.apply(payload).expect("valid update");

        assert_eq!(project.client, None);
        assert_eq!(project.end_date, None);
        assert_eq!(project.name, "Hub");
    }

    #[test]
    fn apply_rejects_end_before_start() {
        let mut project = Project::build(request("Hub"), Utc::now()).expect("valid");
        let err = project
            .apply(ProjectUpdateRequest {
                start_date: Some(NaiveDate::from_ymd_opt(2025, 6, 1)),
                end_date: Some(NaiveDate::from_ymd_opt(2025, 5, 1)),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "end_date"));
    }
}
