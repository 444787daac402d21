//! Family task model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Ordinal used for sorting: high sorts above medium above low.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 3,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(TaskPriority::High),
            "medium" => Ok(TaskPriority::Medium),
            "low" => Ok(TaskPriority::Low),
            _ => Err(CoreError::UnknownVariant {
                kind: "task priority",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Household,
    School,
    Shopping,
    Personal,
    Other,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Household,
        TaskCategory::School,
        TaskCategory::Shopping,
        TaskCategory::Personal,
        TaskCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Household => "household",
            TaskCategory::School => "school",
            TaskCategory::Shopping => "shopping",
            TaskCategory::Personal => "personal",
            TaskCategory::Other => "other",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "task category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    /// Free-text family member name; may be empty.
    #[serde(default)]
    pub assigned_to: String,
    pub priority: TaskPriority,
    #[serde(default)]
    pub completed: bool,
    pub category: TaskCategory,
}

/// User input for a new or edited task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assigned_to: String,
    pub priority: TaskPriority,
    pub category: TaskCategory,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date,
            assigned_to: String::new(),
            priority: TaskPriority::Medium,
            category: TaskCategory::Other,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_assignee(mut self, name: impl Into<String>) -> Self {
        self.assigned_to = name.into();
        self
    }

    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::MissingField("title"));
        }
        Ok(())
    }
}
