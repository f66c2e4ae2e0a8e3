//! Settings endpoints for managing dynamic backend configuration.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::config::DynamicConfig;
use crate::error::ServiceError;

use super::AppState;

/// Response for GET /api/admin/settings
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    /// All current settings (merged: defaults + DB overrides)
    pub settings: HashMap<String, serde_json::Value>,
    /// Which keys have DB overrides (vs using defaults)
    pub overridden: Vec<String>,
}

/// Request body for PUT /api/admin/settings
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    /// Settings to update (key -> value). Use null to delete/revert to default.
    pub settings: HashMap<String, serde_json::Value>,
}

/// GET /api/admin/settings - retrieve all settings with their current values
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<SettingsResponse>, ServiceError> {
    user.require_admin()?;

    // Get DB overrides to know which keys are explicitly set
    let db_settings = state.service.db.get_all_settings()?;

    // Get current config values (merged)
    let config = state.service.runtime_config.dynamic();
    let all_settings = config.to_key_value_map();
    let overridden: Vec<String> = db_settings.keys().cloned().collect();

    Ok(Json(SettingsResponse {
        settings: all_settings,
        overridden,
    }))
}

/// PUT /api/admin/settings - update settings (triggers hot reload)
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ServiceError> {
    user.require_admin()?;

    // Validate setting keys
    let valid_keys = DynamicConfig::valid_keys();
    for key in request.settings.keys() {
        if !valid_keys.contains(key.as_str()) {
            return Err(ServiceError::InvalidRequest {
                message: format!("Unknown setting key: {}", key),
            });
        }
    }

    // Update settings and trigger hot reload
    state.service.update_settings(request.settings).await?;

    // Return updated settings
    get_settings_handler(State(state), user).await
}
