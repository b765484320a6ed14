use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::ResourceKind;
use crate::errors::{AppError, AppResult};
use crate::gateway::ProjectResource;
use crate::utils::{check_date_range, deserialize_nullable, require_text, utc_now};

pub const NAME_MAX: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "2025-10-01")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-10-15")]
    pub end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    /// Members of the same project the task is assigned to, sorted.
    pub assignees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            project_id: row.project_id,
            name: row.name,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
            assignees: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Define launch checklist")]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[schema(example = "pending")]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

/// Partial update. `null` clears `description`, the dates and `assignees`;
/// a given `assignees` list replaces the current set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>, format = Date)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>, format = Date)]
    pub end_date: Option<Option<NaiveDate>>,
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<Vec<Uuid>>)]
    pub assignees: Option<Option<Vec<Uuid>>>,
}

impl Task {
    fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name, Some(NAME_MAX))?;
        check_date_range(self.start_date, self.end_date)
    }

    fn set_assignees(&mut self, mut assignees: Vec<Uuid>) {
        assignees.sort_unstable();
        assignees.dedup();
        self.assignees = assignees;
    }

    async fn insert_assignees(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        for user_id in &self.assignees {
            sqlx::query("INSERT INTO task_assignees (task_id, user_id) VALUES (?, ?)")
                .bind(self.id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectResource for Task {
    const KIND: ResourceKind = ResourceKind::Task;
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static str =
        "id, project_id, name, description, start_date, end_date, status, created_at, updated_at";

    type Row = TaskRow;
    type Create = TaskCreateRequest;
    type Update = TaskUpdateRequest;

    fn from_row(row: Self::Row) -> AppResult<Self> {
        Ok(row.into())
    }

    fn build(project_id: Uuid, payload: Self::Create) -> AppResult<Self> {
        let now = utc_now();
        let mut task = Task {
            id: Uuid::new_v4(),
            project_id,
            name: payload.name,
            description: payload.description,
            start_date: payload.start_date,
            end_date: payload.end_date,
            status: payload.status.unwrap_or_default(),
            assignees: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        task.set_assignees(payload.assignees);
        task.validate()?;
        Ok(task)
    }

    fn apply(&mut self, payload: Self::Update) -> AppResult<()> {
        let TaskUpdateRequest {
            name,
            description,
            start_date,
            end_date,
            status,
            assignees,
        } = payload;

        if let Some(name) = name {
            self.name = name;
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
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(assignees) = assignees {
            self.set_assignees(assignees.unwrap_or_default());
        }
        self.updated_at = utc_now();

        self.validate()
    }

    async fn load_related(items: &mut [Self], conn: &mut SqliteConnection, project_id: Uuid) -> AppResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let pairs: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT a.task_id, a.user_id FROM task_assignees a \
             JOIN tasks t ON t.id = a.task_id \
             WHERE t.project_id = ? ORDER BY a.user_id",
        )
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_task: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (task_id, user_id) in pairs {
            by_task.entry(task_id).or_default().push(user_id);
        }
        for task in items.iter_mut() {
            task.assignees = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn check_references(&self, conn: &mut SqliteConnection) -> AppResult<()> {
        for user_id in &self.assignees {
            let is_member: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM project_memberships WHERE project_id = ? AND user_id = ?)",
            )
            .bind(self.project_id)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

            if !is_member {
                return Err(AppError::validation(
                    "assignees",
                    format!("user {user_id} is not a member of the project"),
                ));
            }
        }
        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, name, description, start_date, end_date, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(self.project_id)
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.start_date)
        .bind(self.end_date)
        .bind(self.status)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(&mut *conn)
        .await?;

        self.insert_assignees(conn).await
    }

    async fn save(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasks SET name = ?, description = ?, start_date = ?, end_date = ?, status = ?, updated_at = ? \
             WHERE id = ? AND project_id = ?",
        )
        .bind(&self.name)
        .bind(&self.description)
        .bind(self.start_date)
        .bind(self.end_date)
        .bind(self.status)
        .bind(self.updated_at)
        .bind(self.id)
        .bind(self.project_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        self.insert_assignees(conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_pending() {
        let task = Task::build(
            Uuid::new_v4(),
            TaskCreateRequest {
                name: "Survey site".to_string(),
                description: None,
                start_date: None,
                end_date: None,
                status: None,
                assignees: Vec::new(),
            },
        )
        .expect("valid task");
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn unknown_status_is_rejected_at_deserialization() {
        let parsed = serde_json::from_str::<TaskCreateRequest>(r#"{"name":"x","status":"archived"}"#);
        assert!(parsed.is_err());
    }

    fn draft() -> Task {
        Task::build(
            Uuid::new_v4(),
            TaskCreateRequest {
                name: "Survey site".to_string(),
                description: Some("old".to_string()),
                start_date: None,
                end_date: NaiveDate::from_ymd_opt(2025, 5, 1),
                status: None,
                assignees: Vec::new(),
            },
        )
        .expect("valid task")
    }

    #[test]
    fn assignees_are_sorted_and_deduplicated() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut task = draft();
        task.apply(TaskUpdateRequest {
            assignees: Some(Some(vec![b, a, b])),
            ..Default::default()
        })
        .expect("valid update");

        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(task.assignees, expected);
    }

    #[test]
    fn null_clears_and_missing_keeps() {
        let mut task = draft();
        task.assignees = vec![Uuid::new_v4()];

        let keep: TaskUpdateRequest = serde_json::from_str(r#"{"name":"Renamed"}"#).expect("valid json");
        task.apply(keep).expect("valid update");
        assert_eq!(task.description.as_deref(), Some("old"));
        assert_eq!(task.assignees.len(), 1);

        let clear: TaskUpdateRequest =
            serde_json::from_str(r#"{"description":null,"end_date":null,"assignees":null}"#).expect("valid json");
        task.apply(clear).expect("valid update");
        assert_eq!(task.description, None);
        assert_eq!(task.end_date, None);
        assert!(task.assignees.is_empty());
        assert_eq!(task.name, "Renamed");
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut task = Task::build(
            Uuid::new_v4(),
            TaskCreateRequest {
                name: "Survey site".to_string(),
                description: None,
                start_date: None,
                end_date: None,
                status: Some(TaskStatus::InProgress),
                assignees: Vec::new(),
            },
        )
        .expect("valid task");

        let err = task
            .apply(TaskUpdateRequest {
                name: Some(" ".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "name"));
    }
}
