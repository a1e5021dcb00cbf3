//! Store connection utilities.

use std::time::Duration;

use crate::supabase::{SupabaseConfig, SupabaseStore};

/// Table used when `SUPABASE_TABLE` is not set.
pub const DEFAULT_TABLE: &str = "mandi_prices";

/// Creates a [`SupabaseStore`] from the `SUPABASE_URL`,
/// `SUPABASE_API_KEY`, and (optional) `SUPABASE_TABLE` environment
/// variables.
///
/// `timeout` bounds every request made by the store.
///
/// # Errors
///
/// Returns an error if a required variable is not set or the HTTP client
/// cannot be built.
pub fn connect_from_env(timeout: Duration) -> Result<SupabaseStore, Box<dyn std::error::Error>> {
    let url = require_env("SUPABASE_URL")?;
    let api_key = require_env("SUPABASE_API_KEY")?;
    let table = std::env::var("SUPABASE_TABLE")
        .ok()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TABLE.to_string());

    let store = SupabaseStore::new(&SupabaseConfig {
        url,
        api_key,
        table,
        timeout,
    })?;

    Ok(store)
}

fn require_env(name: &str) -> Result<String, String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| format!("{name} must be set"))
}
