//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `INTENTIONS__*` 覆盖（双下划线表示嵌套，如 `INTENTIONS__SCHEDULE__ROLLOVER_HOUR=5`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub schedule: ScheduleSection,
    pub llm: LlmSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/intentions.db")
}

/// [schedule] 段：工作日切换时刻
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_rollover_hour")]
    pub rollover_hour: u32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            rollover_hour: default_rollover_hour(),
        }
    }
}

fn default_rollover_hour() -> u32 {
    crate::clock::DEFAULT_ROLLOVER_HOUR
}

/// [llm] 段：主备 provider 与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 每个用户每个工作日可发送的消息数
    #[serde(default = "default_max_messages_per_day")]
    pub max_messages_per_day: u32,
    #[serde(default = "ProviderSection::default_primary")]
    pub primary: ProviderSection,
    /// 未配置时不回退
    #[serde(default)]
    pub secondary: Option<ProviderSection>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            fallback_enabled: default_fallback_enabled(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            max_messages_per_day: default_max_messages_per_day(),
            primary: ProviderSection::default_primary(),
            secondary: None,
        }
    }
}

fn default_fallback_enabled() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// 每个用户每个工作日的默认消息上限
pub const DEFAULT_MAX_MESSAGES_PER_DAY: u32 = 50;

fn default_max_messages_per_day() -> u32 {
    DEFAULT_MAX_MESSAGES_PER_DAY
}

/// [llm.primary] / [llm.secondary]：OpenAI 兼容端点
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProviderSection {
    pub base_url: String,
    pub model: String,
    /// 保存 API Key 的环境变量名
    pub api_key_env: String,
}

impl ProviderSection {
    fn default_primary() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }

    /// 从环境变量读取 API Key，未设置时为 None
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// 从 config 目录加载配置，环境变量 INTENTIONS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 INTENTIONS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{name}.toml")).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("INTENTIONS")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
