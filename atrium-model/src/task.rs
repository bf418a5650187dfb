use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use atrium_core::{Entity, ParentRef};

use crate::project::Project;
use crate::refs::Ref;
use crate::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Vec<Ref<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Ref<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Completion in percent. The backend sends it as a number or a
    /// numeric string.
    #[serde(default, deserialize_with = "lenient_percentage")]
    #[validate(range(max = 100, message = "percentage must be between 0 and 100"))]
    pub percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
}

impl Entity for Task {
    const KIND: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn belongs_to(&self, parent: &ParentRef) -> bool {
        parent.segment == "project"
            && self.project.as_ref().map(Ref::id) == Some(parent.id.as_str())
    }
}

fn lenient_percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = Value::deserialize(deserializer)?;
    let number = match &raw {
        Value::Null => return Ok(0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => return Ok(0),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if (0.0..=255.0).contains(&n) => Ok(n.round() as u8),
        _ => Err(D::Error::custom(format!("invalid percentage: {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percentage_accepts_numbers_and_strings() {
        let a: Task = serde_json::from_value(json!({"_id": "t1", "percentage": 40})).unwrap();
        let b: Task = serde_json::from_value(json!({"_id": "t2", "percentage": "75"})).unwrap();
        let c: Task = serde_json::from_value(json!({"_id": "t3"})).unwrap();
        assert_eq!(a.percentage, 40);
        assert_eq!(b.percentage, 75);
        assert_eq!(c.percentage, 0);
    }

    #[test]
    fn status_uses_kebab_case() {
        let t: Task = serde_json::from_value(json!({"_id": "t1", "status": "in-progress"})).unwrap();
        assert_eq!(t.status, TaskStatus::InProgress);
        assert!(serde_json::from_value::<Task>(json!({"_id": "t1", "status": "done"})).is_err());
    }

    #[test]
    fn out_of_range_percentage_fails_validation() {
        let t: Task = serde_json::from_value(json!({"_id": "t1", "percentage": 120})).unwrap();
        assert!(t.validate().is_err());
    }
}
