//! Core project domain types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{name::Name, pagination::SortColumn};

/// Database identifier for a project.
pub type ProjectId = i64;

/// A project that transactions are booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    /// Unique among projects, ignoring letter case.
    pub name: Name,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Request body for creating and updating a project.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectData {
    pub name: String,
}

/// The columns a project list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ProjectSortColumn {
    #[default]
    Id,
    Name,
    CreatedAt,
}

impl SortColumn for ProjectSortColumn {
    fn from_param(param: &str) -> Option<Self> {
        match param {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::CreatedAt => "created_at",
        }
    }
}
