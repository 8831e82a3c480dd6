use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::entities::{activity_history, rfid_cards};

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub role: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyData {
    pub user: UserDto,
}

/// History entry as rendered to clients: `timestamp` is epoch millis
/// derived from the stored RFC 3339 `created_at`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntryDto {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub desc: String,
    pub icon: String,
    pub timestamp: i64,
    pub metadata: serde_json::Value,
}

impl From<activity_history::Model> for HistoryEntryDto {
    fn from(model: activity_history::Model) -> Self {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&model.created_at)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_default();
        let metadata =
            serde_json::from_str(&model.metadata).unwrap_or(serde_json::Value::Null);

        Self {
            id: model.id,
            kind: model.kind,
            title: model.title,
            desc: model.description,
            icon: model.icon,
            timestamp,
            metadata,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    pub id: i32,
    pub uid: String,
    pub owner_name: String,
    pub description: String,
    pub status: String,
    pub last_used: Option<String>,
    pub created_at: String,
}

impl From<rfid_cards::Model> for CardDto {
    fn from(model: rfid_cards::Model) -> Self {
        Self {
            id: model.id,
            uid: model.uid,
            owner_name: model.owner_name,
            description: model.description,
            status: model.status,
            last_used: model.last_used,
            created_at: model.created_at,
        }
    }
}

/// Identity returned to the door device on a successful card check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCardDto {
    pub uid: String,
    pub owner_name: String,
    pub description: String,
}

/// The verify endpoint answers HTTP 200 either way; `valid` carries
/// the decision.
#[derive(Debug, Serialize)]
pub struct VerifyCardResponse {
    pub success: bool,
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<VerifiedCardDto>,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub timestamp: String,
}
