use serde::{Deserialize, Serialize};

use djamms_core::types::{CommandKind, Lease};

// ─── Request Types ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestMasterBody {
    pub device_id: String,
}

impl RequestMasterBody {
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id.is_empty() {
            return Err("device_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct IssueCommandBody {
    /// Tagged command payload; the shape is enforced by deserialization.
    /// Range problems (volume > 100) are the consumer's to drop — any
    /// client may issue anything well-formed.
    pub command: CommandKind,
    pub issued_by: String,
}

impl IssueCommandBody {
    pub fn validate(&self) -> Result<(), String> {
        if self.issued_by.is_empty() {
            return Err("issued_by is required".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct MarkExecutedBody {
    pub device_id: String,
}

impl MarkExecutedBody {
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id.is_empty() {
            return Err("device_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct PublishStateBody {
    pub device_id: String,
    pub now_playing: Option<djamms_core::types::NowPlaying>,
    pub is_playing: bool,
    pub volume: u8,
}

impl PublishStateBody {
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id.is_empty() {
            return Err("device_id is required".to_string());
        }
        Ok(())
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Serialize)]
pub struct MasterInfo {
    pub venue_id: String,
    pub device_id: String,
    pub status: String,
    pub heartbeat_at: u64,
    pub expires_at: u64,
}

impl MasterInfo {
    pub fn from_lease(lease: &Lease) -> Self {
        Self {
            venue_id: lease.venue_id.clone(),
            device_id: lease.device_id.clone(),
            status: format!("{:?}", lease.status),
            heartbeat_at: lease.heartbeat_at,
            expires_at: lease.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct HeartbeatResponse {
    pub renewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_device: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
