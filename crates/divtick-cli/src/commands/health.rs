use divtick_core::{IngestConfig, ProviderPolicy, WarehouseConfig};
use serde_json::json;

use crate::cli::Backend;
use crate::error::CliError;

use super::CommandResult;

pub fn run(backend: Backend, config: &IngestConfig) -> Result<CommandResult, CliError> {
    let policy = ProviderPolicy::polygon_free_tier();
    let storage = match backend {
        Backend::Rest => json!({
            "backend": "rest",
            "configured": config.supabase_url.is_some() && config.supabase_key.is_some(),
        }),
        Backend::Warehouse => json!({
            "backend": "warehouse",
            "db_path": WarehouseConfig::default().db_path.display().to_string(),
        }),
    };

    let data = json!({
        "status": "healthy",
        "capabilities": config.capabilities(),
        "storage": storage,
        "rate_budget": {
            "provider": policy.provider,
            "quota_limit": policy.quota_limit,
            "quota_window_secs": policy.quota_window.as_secs(),
            "pacing_interval_secs": (policy.quota_window / policy.quota_limit).as_secs(),
        },
    });

    Ok(CommandResult::ok(data))
}
