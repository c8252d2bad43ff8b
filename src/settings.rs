use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

pub const DEFAULT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen-mt-turbo";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// User-facing settings. Field names are camelCase on the wire (HTTP and
/// settings files) to match the schema the external UIs use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    pub auto_translate: bool,
    pub target_language: String,
    pub provider: ProviderConfig,
    pub model: String,
    pub models: Vec<String>,
    pub always_translate_languages: HashMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_translate: true,
            target_language: "zh-CN".to_string(),
            provider: ProviderConfig::default(),
            model: DEFAULT_MODEL.to_string(),
            models: vec![
                "qwen-mt-turbo".to_string(),
                "qwen-mt-plus".to_string(),
                "qwen-mt-max".to_string(),
            ],
            always_translate_languages: HashMap::from([
                ("en".to_string(), true),
                ("ja".to_string(), true),
            ]),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Partial settings update. Top-level fields replace wholesale; the
/// `provider` and `alwaysTranslateLanguages` fields merge key-by-key.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub auto_translate: Option<bool>,
    pub target_language: Option<String>,
    pub provider: Option<ProviderPatch>,
    pub model: Option<String>,
    pub models: Option<Vec<String>>,
    pub always_translate_languages: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderPatch {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl Settings {
    pub fn apply_patch(&mut self, patch: SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(auto_translate) = patch.auto_translate {
            self.auto_translate = auto_translate;
        }
        if let Some(target_language) = patch.target_language {
            self.target_language = target_language;
        }
        if let Some(provider) = patch.provider {
            if let Some(endpoint) = provider.endpoint {
                self.provider.endpoint = endpoint;
            }
            if let Some(api_key) = provider.api_key {
                self.provider.api_key = api_key;
            }
            if let Some(timeout_ms) = provider.timeout_ms {
                self.provider.timeout_ms = timeout_ms;
            }
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(models) = patch.models {
            self.models = models;
        }
        if let Some(languages) = patch.always_translate_languages {
            for (code, enabled) in languages {
                self.always_translate_languages.insert(code, enabled);
            }
        }
    }
}

/// Layered settings load: repo-local files first, then the home
/// directory, then an explicit extra path. Later files win field-by-field
/// with the same merge rules as a patch.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let patch: SettingsPatch = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.apply_patch(patch);
        }
    }

    Ok(settings)
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".llm-page-translator"))
        }
    })
}
