use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTrack {
    pub content_url: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_skipped: Option<DateTime<Utc>>,
    #[serde(default)]
    pub play_count: Option<i64>,
    #[serde(default)]
    pub skip_count: Option<i64>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePlaylist {
    pub name: String,
    pub smart: bool,
    pub hidden: bool,
    pub members: Vec<SourceTrack>,
}

#[cfg(test)]
impl SourceTrack {
    pub fn mock(content_url: &str) -> Self {
        Self {
            content_url: content_url.to_string(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            last_played: None,
            last_skipped: None,
            play_count: None,
            skip_count: None,
            rating: None,
            name: "Mock Track".to_string(),
            artist: "Mock Artist".to_string(),
        }
    }
}
