use serde::{Deserialize, Serialize};

pub const PING_ENDPOINT: &str = "/api/server/ping";
pub const SERVER_ENDPOINT: &str = "/api/server/";
pub const ABOUT_ENDPOINT: &str = "/api/server/about";
pub const STORAGE_ENDPOINT: &str = "/api/server/storage";
pub const STATISTICS_ENDPOINT: &str = "/api/server/statistics";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAbout {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStorage {
    pub disk_available_raw: u64,
    pub disk_size_raw: u64,
    pub disk_use_raw: u64,
    pub disk_usage_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatistics {
    pub photos: u64,
    pub videos: u64,
    pub usage: u64,
    #[serde(default)]
    pub usage_by_user: Vec<UserUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUsage {
    pub user_name: String,
    pub photos: u64,
    pub videos: u64,
    pub usage: u64,
}

impl UserUsage {
    /// Label value for this user: the display name up to the first whitespace.
    pub fn first_name(&self) -> &str {
        first_name(&self.user_name)
    }
}

pub fn first_name(user_name: &str) -> &str {
    user_name.split_whitespace().next().unwrap_or_default()
}
