//! 领域模型：Task（每日意图）、RecurringPattern（循环规则）、AuditEntry（审计记录）、ChatRecord（对话记录）
//!
//! 字段与 SQLite 表一一对应；业务约束（标题长度、频率专属字段、frog 唯一）在写入前校验。

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::StoreError;

pub type TaskId = i64;
pub type PatternId = i64;
pub type UserId = i64;

/// 标题最大字符数
pub const MAX_TITLE_CHARS: usize = 500;

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// 由 completed / neverminded 推导出的状态（completed > neverminded > active）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
    Neverminded,
}

/// 列表查询的状态过滤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    Completed,
    Neverminded,
    #[default]
    All,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Neverminded => "neverminded",
            Self::All => "all",
        }
    }
}

/// Task 上五个独立的布尔标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusField {
    Completed,
    Neverminded,
    Sticky,
    Froggy,
    AnxietyInducing,
}

impl StatusField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Neverminded => "neverminded",
            Self::Sticky => "sticky",
            Self::Froggy => "froggy",
            Self::AnxietyInducing => "anxiety_inducing",
        }
    }

    /// 面向用户的名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Neverminded => "neverminded",
            Self::Sticky => "sticky",
            Self::Froggy => "frog (most important)",
            Self::AnxietyInducing => "anxiety-inducing",
        }
    }
}

/// 每日意图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub owner: UserId,
    pub title: String,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// 同一 (owner, date) 内的排序键，相同时按 created_at
    pub order: i64,
    pub completed: bool,
    pub neverminded: bool,
    pub sticky: bool,
    pub froggy: bool,
    pub anxiety_inducing: bool,
    /// 生成该任务的循环规则；规则删除后置空
    pub pattern_id: Option<PatternId>,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else if self.neverminded {
            TaskStatus::Neverminded
        } else {
            TaskStatus::Active
        }
    }

    pub fn matches(&self, filter: StatusFilter) -> bool {
        match filter {
            StatusFilter::All => true,
            StatusFilter::Active => self.status() == TaskStatus::Active,
            StatusFilter::Completed => self.completed,
            StatusFilter::Neverminded => self.neverminded,
        }
    }

    pub fn flag(&self, field: StatusField) -> bool {
        match field {
            StatusField::Completed => self.completed,
            StatusField::Neverminded => self.neverminded,
            StatusField::Sticky => self.sticky,
            StatusField::Froggy => self.froggy,
            StatusField::AnxietyInducing => self.anxiety_inducing,
        }
    }
}

/// 待插入的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub date: NaiveDate,
    pub sticky: bool,
    pub froggy: bool,
    pub anxiety_inducing: bool,
    pub pattern_id: Option<PatternId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            sticky: false,
            froggy: false,
            anxiety_inducing: false,
            pattern_id: None,
        }
    }

    pub fn froggy(mut self, froggy: bool) -> Self {
        self.froggy = froggy;
        self
    }

    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn anxiety_inducing(mut self, anxiety_inducing: bool) -> Self {
        self.anxiety_inducing = anxiety_inducing;
        self
    }
}

/// 规范化标题：去首尾空白，非空且不超过 MAX_TITLE_CHARS
pub fn normalize_title(raw: &str) -> Result<String, StoreError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(StoreError::Validation(
            "Title is required and cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(StoreError::Validation(format!(
            "Title cannot exceed {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

/// 循环频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// 循环规则的可编辑部分（创建与更新共用同一套校验）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub title: String,
    pub frequency: Frequency,
    pub interval: u32,
    /// 0 = 周一 … 6 = 周日，仅 weekly 有意义
    pub days_of_week: Vec<u8>,
    /// 1–31，monthly / yearly 有意义
    pub day_of_month: Option<u32>,
    /// 1–12，仅 yearly 有意义
    pub month: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub default_sticky: bool,
    pub default_froggy: bool,
    pub default_anxiety_inducing: bool,
}

impl PatternRule {
    pub fn daily(title: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            frequency: Frequency::Daily,
            interval: 1,
            days_of_week: Vec::new(),
            day_of_month: None,
            month: None,
            start_date,
            end_date: None,
            default_sticky: false,
            default_froggy: false,
            default_anxiety_inducing: false,
        }
    }

    /// 校验并规范化：缺少当前频率所需字段即报错；与频率无关的字段被清空
    pub fn validated(mut self) -> Result<Self, StoreError> {
        self.title = normalize_title(&self.title)?;
        if self.interval < 1 {
            return Err(invalid("interval must be a positive integer (1 or greater)"));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(invalid("end_date cannot be before start_date"));
            }
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(invalid("day_of_month must be an integer between 1 and 31"));
            }
        }
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(invalid("month must be an integer between 1 and 12"));
            }
        }
        if self.days_of_week.iter().any(|d| *d > 6) {
            return Err(invalid(
                "days_of_week must contain integers between 0 (Monday) and 6 (Sunday)",
            ));
        }

        match self.frequency {
            Frequency::Daily => {
                self.days_of_week.clear();
                self.day_of_month = None;
                self.month = None;
            }
            Frequency::Weekly => {
                if self.days_of_week.is_empty() {
                    return Err(invalid(
                        "days_of_week is required for weekly frequency (list of 0-6, where 0=Monday)",
                    ));
                }
                self.days_of_week.sort_unstable();
                self.days_of_week.dedup();
                self.day_of_month = None;
                self.month = None;
            }
            Frequency::Monthly => {
                if self.day_of_month.is_none() {
                    return Err(invalid("day_of_month is required for monthly frequency (1-31)"));
                }
                self.days_of_week.clear();
                self.month = None;
            }
            Frequency::Yearly => {
                if self.month.is_none() {
                    return Err(invalid("month is required for yearly frequency (1-12)"));
                }
                if self.day_of_month.is_none() {
                    return Err(invalid("day_of_month is required for yearly frequency (1-31)"));
                }
                self.days_of_week.clear();
            }
        }
        Ok(self)
    }
}

fn invalid(msg: &str) -> StoreError {
    StoreError::Validation(msg.to_string())
}

/// 持久化后的循环规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub id: PatternId,
    pub owner: UserId,
    #[serde(flatten)]
    pub rule: PatternRule,
    pub active: bool,
    /// 最近一次成功生成的日期（仅供参考）
    pub last_generated_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl RecurringPattern {
    /// 人类可读的规则描述，如 "weekly on Mon, Wed" / "every 2 month(s) on day 15"
    pub fn describe(&self) -> String {
        let r = &self.rule;
        let n = r.interval;
        match r.frequency {
            Frequency::Daily if n > 1 => format!("every {n} day(s)"),
            Frequency::Daily => "daily".to_string(),
            Frequency::Weekly => {
                if r.days_of_week.is_empty() {
                    return "weekly (no days configured)".to_string();
                }
                let names: Vec<&str> = r
                    .days_of_week
                    .iter()
                    .filter_map(|d| WEEKDAY_NAMES.get(*d as usize).copied())
                    .collect();
                if n > 1 {
                    format!("every {n} week(s) on {}", names.join(", "))
                } else {
                    format!("weekly on {}", names.join(", "))
                }
            }
            Frequency::Monthly => {
                let day = display_opt(r.day_of_month);
                if n > 1 {
                    format!("every {n} month(s) on day {day}")
                } else {
                    format!("monthly on day {day}")
                }
            }
            Frequency::Yearly => {
                let month = display_opt(r.month);
                let day = display_opt(r.day_of_month);
                if n > 1 {
                    format!("every {n} year(s) on {month}/{day}")
                } else {
                    format!("yearly on {month}/{day}")
                }
            }
        }
    }
}

fn display_opt(v: Option<u32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string())
}

/// 审计记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub owner: Option<UserId>,
    pub tool: String,
    pub input: serde_json::Value,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

/// 持久化对话中的发言方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// 一条持久化的对话消息；day 为写入时的工作日，用于每日限额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: i64,
    pub owner: UserId,
    pub role: ChatRole,
    pub content: String,
    /// 助手消息对应回合的工具执行（JSON 数组）
    pub tool_executions: Option<serde_json::Value>,
    pub provider: Option<String>,
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
}
