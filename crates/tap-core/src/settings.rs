//! Global tuning settings loaded from TOML.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub scoring: ScoringSettings,
    pub search: SearchSettings,
    pub decay: DecaySettings,
}

/// Edit demotion/promotion rates in percent.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    pub missing_char_rate: u32,
    /// Omissions are only considered once ten times the input index has
    /// passed this value.
    pub missing_char_start_index_10x: u32,
    pub missing_space_rate: u32,
    pub excessive_char_rate: u32,
    pub excessive_char_out_of_proximity_rate: u32,
    pub transposed_chars_rate: u32,
    pub proximity_char_rate: u32,
    pub full_match_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub max_results: usize,
    pub frontier_capacity: usize,
    pub depth_budget_multiplier: usize,
    pub cost_slack: f32,
    pub filter_predictions_by_first_letter: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecaySettings {
    /// Decay table id: "weak", "modest", "strong" or "aggressive".
    pub table: String,
    pub max_unigram_count: u32,
    pub max_bigram_count: u32,
}

fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;

    if s.search.max_results == 0 {
        return Err(SettingsError::InvalidValue {
            field: "search.max_results".into(),
            reason: "must be at least 1".into(),
        });
    }
    if s.search.frontier_capacity == 0 {
        return Err(SettingsError::InvalidValue {
            field: "search.frontier_capacity".into(),
            reason: "must be at least 1".into(),
        });
    }
    if !matches!(
        s.decay.table.as_str(),
        "weak" | "modest" | "strong" | "aggressive"
    ) {
        return Err(SettingsError::InvalidValue {
            field: "decay.table".into(),
            reason: format!("unknown table id {:?}", s.decay.table),
        });
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.scoring.full_match_rate, 120);
        assert_eq!(s.search.max_results, 18);
    }

    #[test]
    fn test_rejects_bad_table_id() {
        let toml = DEFAULT_SETTINGS_TOML.replace("\"modest\"", "\"bogus\"");
        assert!(parse_settings_toml(&toml).is_err());
    }
}
