//! Acting user for mutating operations.

use serde::{Deserialize, Serialize};

/// Platform role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

/// The user on whose behalf a write is performed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Maintenance identity used by batch jobs.
    pub fn system() -> Self {
        Self::new("system", Role::Admin)
    }

    /// Admins may edit every course; instructors only their own.
    pub fn can_edit(&self, instructor_id: Option<&str>) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Instructor => instructor_id == Some(self.user_id.as_str()),
            Role::Student => false,
        }
    }
}
