//! 循环规则类工具

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::core::ToolError;
use crate::store::{Frequency, PatternId, PatternRule, PatternUpdate, RecurringPattern};
use crate::tools::request::{parse_date, resolve_date, ToolContext};

/// Create a recurring pattern.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreatePatternInput {
    /// Title of the generated tasks
    pub title: String,
    /// daily, weekly, monthly or yearly
    pub frequency: Frequency,
    /// Every N units (default 1)
    #[serde(default)]
    pub interval: Option<u32>,
    /// Weekly only: weekdays 0 (Monday) to 6 (Sunday)
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    /// Monthly / yearly: day of month 1-31 (clamped to short months)
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Yearly only: month 1-12
    #[serde(default)]
    pub month: Option<u32>,
    /// First date in YYYY-MM-DD format; defaults to today
    #[serde(default)]
    pub start_date: Option<String>,
    /// Optional last date in YYYY-MM-DD format
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub default_sticky: bool,
    #[serde(default)]
    pub default_froggy: bool,
    #[serde(default)]
    pub default_anxiety_inducing: bool,
}

/// List recurring patterns.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListPatternsInput {
    /// Only active patterns (default true)
    #[serde(default = "default_true")]
    pub active_only: bool,
}

fn default_true() -> bool {
    true
}

/// Update a recurring pattern; omitted fields stay unchanged.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdatePatternInput {
    /// ID of the recurring pattern
    pub pattern_id: PatternId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default)]
    pub day_of_month: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub start_date: Option<String>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub default_sticky: Option<bool>,
    #[serde(default)]
    pub default_froggy: Option<bool>,
    #[serde(default)]
    pub default_anxiety_inducing: Option<bool>,
}

/// Identify a recurring pattern.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PatternIdInput {
    /// ID of the recurring pattern
    pub pattern_id: PatternId,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternView {
    pub id: PatternId,
    pub title: String,
    pub frequency: Frequency,
    /// 人类可读描述
    pub pattern: String,
    pub interval: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub default_sticky: bool,
    pub default_froggy: bool,
    pub default_anxiety_inducing: bool,
    pub last_generated_date: Option<NaiveDate>,
}

impl From<&RecurringPattern> for PatternView {
    fn from(p: &RecurringPattern) -> Self {
        Self {
            id: p.id,
            title: p.rule.title.clone(),
            frequency: p.rule.frequency,
            pattern: p.describe(),
            interval: p.rule.interval,
            start_date: p.rule.start_date,
            end_date: p.rule.end_date,
            is_active: p.active,
            default_sticky: p.rule.default_sticky,
            default_froggy: p.rule.default_froggy,
            default_anxiety_inducing: p.rule.default_anxiety_inducing,
            last_generated_date: p.last_generated_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PatternOutput {
    pub pattern: PatternView,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PatternListOutput {
    pub count: usize,
    pub active_only: bool,
    pub patterns: Vec<PatternView>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PatternChangesOutput {
    pub pattern: PatternView,
    pub changes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PatternStateOutput {
    pub pattern_id: PatternId,
    pub title: String,
    pub is_active: bool,
    pub message: String,
}

fn optional_date(label: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ToolError> {
    raw.map(|s| parse_date(label, s)).transpose()
}

pub(crate) fn create_pattern(
    ctx: &ToolContext<'_>,
    input: CreatePatternInput,
) -> Result<PatternOutput, ToolError> {
    let start_date = resolve_date("start_date", input.start_date.as_deref(), ctx.today)?;
    let rule = PatternRule {
        title: input.title,
        frequency: input.frequency,
        interval: input.interval.unwrap_or(1),
        days_of_week: input.days_of_week.unwrap_or_default(),
        day_of_month: input.day_of_month,
        month: input.month,
        start_date,
        end_date: optional_date("end_date", input.end_date.as_deref())?,
        default_sticky: input.default_sticky,
        default_froggy: input.default_froggy,
        default_anxiety_inducing: input.default_anxiety_inducing,
    };
    let pattern = ctx.store.create_pattern(ctx.owner, rule)?;
    Ok(PatternOutput {
        message: format!(
            "Created recurring pattern '{}' ({})",
            pattern.rule.title,
            pattern.describe()
        ),
        pattern: PatternView::from(&pattern),
    })
}

pub(crate) fn list_patterns(
    ctx: &ToolContext<'_>,
    input: ListPatternsInput,
) -> Result<PatternListOutput, ToolError> {
    let patterns = ctx.store.list_patterns(ctx.owner, input.active_only)?;
    Ok(PatternListOutput {
        count: patterns.len(),
        active_only: input.active_only,
        message: format!("Found {} recurring pattern(s)", patterns.len()),
        patterns: patterns.iter().map(PatternView::from).collect(),
    })
}

pub(crate) fn update_pattern(
    ctx: &ToolContext<'_>,
    input: UpdatePatternInput,
) -> Result<PatternChangesOutput, ToolError> {
    if matches!(&input.days_of_week, Some(days) if days.is_empty()) {
        return Err(ToolError::InvalidInput("days_of_week cannot be empty".to_string()));
    }
    let update = PatternUpdate {
        title: input.title,
        frequency: input.frequency,
        interval: input.interval,
        days_of_week: input.days_of_week,
        day_of_month: input.day_of_month,
        month: input.month,
        start_date: optional_date("start_date", input.start_date.as_deref())?,
        end_date: optional_date("end_date", input.end_date.as_deref())?,
        default_sticky: input.default_sticky,
        default_froggy: input.default_froggy,
        default_anxiety_inducing: input.default_anxiety_inducing,
    };
    let (pattern, changes) = ctx
        .store
        .update_pattern(ctx.owner, input.pattern_id, update)?;
    let message = if changes.is_empty() {
        "No changes made - recurring pattern already has the specified values".to_string()
    } else {
        format!("Successfully updated recurring pattern: {}", changes.join(", "))
    };
    Ok(PatternChangesOutput {
        pattern: PatternView::from(&pattern),
        changes,
        message,
    })
}

pub(crate) fn set_pattern_active(
    ctx: &ToolContext<'_>,
    input: PatternIdInput,
    active: bool,
) -> Result<PatternStateOutput, ToolError> {
    let (pattern, changed) = ctx
        .store
        .set_pattern_active(ctx.owner, input.pattern_id, active)?;
    let title = pattern.rule.title;
    let message = match (active, changed) {
        (false, true) => format!("Successfully paused recurring pattern: {title}"),
        (false, false) => format!("Recurring pattern was already paused: {title}"),
        (true, true) => format!("Successfully resumed recurring pattern: {title}"),
        (true, false) => format!("Recurring pattern was already active: {title}"),
    };
    Ok(PatternStateOutput {
        pattern_id: pattern.id,
        title,
        is_active: active,
        message,
    })
}

pub(crate) fn delete_pattern(
    ctx: &ToolContext<'_>,
    input: PatternIdInput,
) -> Result<PatternStateOutput, ToolError> {
    let pattern = ctx.store.delete_pattern(ctx.owner, input.pattern_id)?;
    let title = pattern.rule.title;
    Ok(PatternStateOutput {
        pattern_id: pattern.id,
        message: format!("Successfully deleted recurring pattern: {title}"),
        title,
        is_active: pattern.active,
    })
}
