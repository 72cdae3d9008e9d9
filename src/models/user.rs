//! User identity as decoded from the access token.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portal role, derived from the single-character user-type code
/// embedded in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Student,
    Teacher,
    Employee,
}

impl Role {
    /// Total mapping from the raw user-type code: `"S"` is a student,
    /// `"T"` is a teacher, anything else (including absent) an employee.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("S") => Role::Student,
            Some("T") => Role::Teacher,
            _ => Role::Employee,
        }
    }
}

/// User identity, rebuilt from the access token on every token change.
///
/// Never fetched remotely; destroyed whenever the token is cleared or
/// fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub patronymic: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Avatar reference (URL or storage key, as the server sent it)
    pub avatar: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub role: Role,
    /// Unread notification counter carried in the token payload
    pub notifications: u32,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.patronymic {
            Some(patronymic) => format!("{} {} {}", self.last_name, self.first_name, patronymic),
            None => format!("{} {}", self.last_name, self.first_name),
        }
    }
}
