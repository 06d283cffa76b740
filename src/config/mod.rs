use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::core::{
    errors::CrmError,
    utils::{ensure_dir, slugify, write_atomic, PathResolver},
};
use crate::engine::{
    documentation::{DEFAULT_ADVERTISING_TAG, DEFAULT_SPECIAL_VENDORS},
    CommissionEngine, DocumentationPolicy, HAK_EDIS_RATE,
};
use crate::storage::DEFAULT_RETENTION;

const BACKUP_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    pub hak_edis_rate: f64,
    pub advertising_tag: String,
    pub special_vendors: Vec<String>,
    pub backup_retention: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_book: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "tr-TR".into(),
            currency: "TRY".into(),
            hak_edis_rate: HAK_EDIS_RATE,
            advertising_tag: DEFAULT_ADVERTISING_TAG.into(),
            special_vendors: DEFAULT_SPECIAL_VENDORS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            backup_retention: DEFAULT_RETENTION,
            last_opened_book: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), CrmError> {
        let mut errors = Vec::new();
        if !(self.hak_edis_rate.is_finite() && self.hak_edis_rate > 0.0 && self.hak_edis_rate < 1.0)
        {
            errors.push(format!(
                "hak_edis_rate must be between 0 and 1 (exclusive), got {}",
                self.hak_edis_rate
            ));
        }
        if self.currency.trim().is_empty() {
            errors.push("currency is required".into());
        }
        if self.advertising_tag.trim().is_empty() {
            errors.push("advertising_tag is required".into());
        }
        if self.backup_retention == 0 {
            errors.push("backup_retention must be at least 1".into());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CrmError::Configuration(errors.join("; ")))
        }
    }

    pub fn engine(&self) -> CommissionEngine {
        CommissionEngine::new(self.hak_edis_rate)
    }

    pub fn documentation_policy(&self) -> DocumentationPolicy {
        DocumentationPolicy {
            advertising_tag: self.advertising_tag.trim().to_string(),
            special_vendors: self
                .special_vendors
                .iter()
                .map(|name| name.trim().to_uppercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Sets one field from its textual form; used by the `config` command.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CrmError> {
        let value = value.trim();
        let mut candidate = self.clone();
        match key {
            "locale" => candidate.locale = value.to_string(),
            "currency" => candidate.currency = value.to_ascii_uppercase(),
            "hak_edis_rate" => {
                candidate.hak_edis_rate = value.parse().map_err(|_| {
                    CrmError::Configuration(format!("hak_edis_rate must be a number, got `{value}`"))
                })?
            }
            "advertising_tag" => candidate.advertising_tag = value.to_uppercase(),
            "special_vendors" => {
                candidate.special_vendors = value
                    .split(',')
                    .map(|name| name.trim().to_uppercase())
                    .filter(|name| !name.is_empty())
                    .collect()
            }
            "backup_retention" => {
                candidate.backup_retention = value.parse().map_err(|_| {
                    CrmError::Configuration(format!(
                        "backup_retention must be a whole number, got `{value}`"
                    ))
                })?
            }
            other => {
                return Err(CrmError::Configuration(format!(
                    "unknown configuration key `{other}`"
                )))
            }
        }
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
    backups_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, CrmError> {
        Self::from_base(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, CrmError> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self, CrmError> {
        ensure_dir(&base)?;
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        let backups_dir = PathResolver::config_backup_dir_in(&base);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            backups_dir,
        })
    }

    /// Missing file yields defaults; a present but invalid file is an error.
    pub fn load(&self) -> Result<Config, CrmError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| CrmError::Configuration(format!("{}: {err}", self.path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), CrmError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }

    pub fn backup(&self, config: &Config, note: Option<&str>) -> Result<String, CrmError> {
        ensure_dir(&self.backups_dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let mut name = format!("config_{}", timestamp);
        if let Some(label) = note.and_then(slugify) {
            name.push('_');
            name.push_str(&label);
        }
        name.push_str(&format!(".{}", BACKUP_EXTENSION));
        let path = self.backups_dir.join(&name);
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&path, &json)?;
        Ok(name)
    }

    pub fn restore(&self, backup_name: &str) -> Result<Config, CrmError> {
        let path = self.backups_dir.join(backup_name);
        if !path.exists() {
            return Err(CrmError::Storage(format!(
                "configuration backup `{}` not found",
                backup_name
            )));
        }
        let data = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        self.save(&config)?;
        Ok(config)
    }

    /// Newest first.
    pub fn list_backups(&self) -> Result<Vec<String>, CrmError> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            parse_timestamp(b)
                .cmp(&parse_timestamp(a))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let raw = name.strip_prefix("config_")?.get(..15)?;
    NaiveDateTime::parse_from_str(raw, "%Y%m%d_%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
