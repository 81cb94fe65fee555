use crate::errors::{AppError, AppResult};

/// Ids are opaque strings; only blank ones are rejected.
pub fn parse_id(id: &str) -> AppResult<&str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::ValidationError("Id cannot be empty".to_string()));
    }
    Ok(id)
}
