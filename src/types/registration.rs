//! Registration records: the wizard's login handoff and the rows written to the backend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity data captured upstream and handed from step to step.
///
/// Field names follow the host's `login` object on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub name: String,
    #[serde(rename = "number")]
    pub phone_number: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl PendingRegistration {
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            password: password.into(),
            user_id: None,
        }
    }

    /// Merge a created user's id into the handoff record
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Row inserted into the users table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub phone_number: String,
    pub password: String,
}

impl From<&PendingRegistration> for NewUser {
    fn from(login: &PendingRegistration) -> Self {
        Self {
            name: login.name.clone(),
            phone_number: login.phone_number.clone(),
            password: login.password.clone(),
        }
    }
}

/// Row returned from the users table; only the generated id is read
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserRow {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// Row inserted into the companies table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRecord {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub activity: String,
    pub location: String,
    pub lat: f64,
    pub lng: f64,
    pub logo: Option<String>,
    pub phone_number: Option<String>,
}

pub const DOCUMENT_FILE_TYPE: &str = "document";

/// Row inserted into the files table, one per uploaded document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub company_id: Uuid,
    pub file_type: &'static str,
    pub file_url: String,
}

impl FileRecord {
    pub fn document(company_id: Uuid, file_url: impl Into<String>) -> Self {
        Self {
            company_id,
            file_type: DOCUMENT_FILE_TYPE,
            file_url: file_url.into(),
        }
    }
}

/// Users tables key rows by either bigint or uuid ids
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
