use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `id` is the stable identity the hosting platform stamps on requests.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub xp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: &str, display_name: &str) -> Self {
        User {
            id: id.to_string(),
            display_name: display_name.to_string(),
            xp: 0,
            created_at: Some(Utc::now()),
        }
    }
}
