//! Intentions 命令行入口
//!
//! - generate：循环规则批量生成（可由 cron 定时调用）
//! - chat：对单条输入跑一个 Agent 回合
//! - carry-forward：把未完成的 sticky 任务补齐到当前工作日
//! - history / clear-history：查看或清空某用户的对话记录

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use intentions::config::{load_config, AppConfig};
use intentions::core::Actor;
use intentions::react::{AgentEvent, TurnOutcome};
use intentions::recurrence::{run_batch, BatchRequest};
use intentions::store::ChatRole;
use intentions::{Agent, TaskStore, WorkingDay};

#[derive(Parser, Debug)]
#[command(name = "intentions", version)]
#[command(about = "Daily task tracking with recurring patterns and an assistant")]
struct Cli {
    /// 额外配置文件（覆盖 config/default.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出 debug 日志；generate 同时列出未到期条目及原因
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 为活跃循环规则生成任务
    Generate {
        /// 起始日期，默认当前工作日
        #[arg(long)]
        date: Option<NaiveDate>,

        /// 额外向后覆盖的天数（0 只处理起始日，最多 3660）
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=3660))]
        days: u32,

        /// 只处理该用户的规则
        #[arg(long)]
        user_id: Option<i64>,

        /// 只报告，不写入
        #[arg(long)]
        dry_run: bool,
    },
    /// 发送一条消息给助手
    Chat {
        #[arg(long)]
        user_id: i64,

        #[arg(required = true)]
        message: Vec<String>,
    },
    /// 把 sticky 任务复制到当前工作日
    CarryForward {
        #[arg(long)]
        user_id: i64,
    },
    /// 打印对话记录
    History {
        #[arg(long)]
        user_id: i64,

        /// 只显示最近 N 条
        #[arg(long)]
        last: Option<usize>,
    },
    /// 删除该用户的全部对话记录
    ClearHistory {
        #[arg(long)]
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    intentions::observability::init(cli.verbose);

    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    match cli.command {
        Command::Generate {
            date,
            days,
            user_id,
            dry_run,
        } => generate(&cfg, date, days, user_id, dry_run, cli.verbose),
        Command::Chat { user_id, message } => chat(&cfg, user_id, &message.join(" ")).await,
        Command::CarryForward { user_id } => carry_forward(&cfg, user_id),
        Command::History { user_id, last } => history(&cfg, user_id, last),
        Command::ClearHistory { user_id } => clear_history(&cfg, user_id),
    }
}

fn open_store(cfg: &AppConfig) -> anyhow::Result<TaskStore> {
    TaskStore::open(&cfg.app.database_path)
        .with_context(|| format!("Failed to open database {}", cfg.app.database_path.display()))
}

fn generate(
    cfg: &AppConfig,
    date: Option<NaiveDate>,
    days_ahead: u32,
    owner: Option<i64>,
    dry_run: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let start = date.unwrap_or_else(|| WorkingDay::new(cfg.schedule.rollover_hour).today());
    let request = BatchRequest {
        start,
        days_ahead,
        owner,
        dry_run,
    };
    let report = run_batch(&store, &request).context("Recurring task generation failed")?;

    if dry_run {
        println!("DRY RUN - no tasks will be created");
    }
    println!("Processing {} active recurring pattern(s)", report.patterns);
    for date in request.dates() {
        println!("\n{}", date.format("%Y-%m-%d (%A)"));
        for entry in report.entries_for(date) {
            if entry.is_not_due() && !verbose {
                continue;
            }
            println!("  - [user {}] {}", entry.owner, entry.describe(dry_run));
        }
    }
    println!(
        "\nSummary: {} created, {} skipped, {} failed",
        report.created,
        report.skipped(),
        report.failed
    );
    Ok(())
}

async fn chat(cfg: &AppConfig, user_id: i64, message: &str) -> anyhow::Result<()> {
    let agent = Agent::from_config(cfg).context("Failed to create agent")?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<AgentEvent>();
    let printer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            match ev {
                AgentEvent::ToolCall { tool, args } => eprintln!("-> {tool} {args}"),
                AgentEvent::ToolResult { tool, success, preview } => {
                    eprintln!("<- {tool} {}: {preview}", if success { "ok" } else { "error" })
                }
                AgentEvent::ProviderFallback { primary, secondary, error } => {
                    eprintln!("(provider {primary} failed: {error}; using {secondary})")
                }
                _ => {}
            }
        }
    });

    let result = agent.chat(&Actor::new(user_id), message, Some(&tx)).await;
    drop(tx);
    let _ = printer.await;
    let result = result.context("Chat turn failed")?;

    println!("{}", result.response);
    if result.outcome == TurnOutcome::ProviderUnavailable {
        anyhow::bail!("assistant unavailable");
    }
    Ok(())
}

fn carry_forward(cfg: &AppConfig, user_id: i64) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let today = WorkingDay::new(cfg.schedule.rollover_hour).today();
    let created = store
        .carry_forward_until(user_id, today)
        .context("Carry-forward failed")?;
    for task in &created {
        println!("{} {} (ID: {})", task.date, task.title, task.id);
    }
    println!("{} sticky task(s) carried forward", created.len());
    Ok(())
}

fn history(cfg: &AppConfig, user_id: i64, last: Option<usize>) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let records = match last {
        Some(n) => store.recent_chat(user_id, n),
        None => store.list_chat(user_id),
    }
    .context("Failed to load chat history")?;
    for record in &records {
        let who = match record.role {
            ChatRole::User => "you".to_string(),
            ChatRole::Assistant => record.provider.clone().unwrap_or_else(|| "assistant".to_string()),
        };
        println!("[{}] {who}: {}", record.created_at.format("%Y-%m-%d %H:%M"), record.content);
    }
    println!("{} message(s)", records.len());
    Ok(())
}

fn clear_history(cfg: &AppConfig, user_id: i64) -> anyhow::Result<()> {
    let store = open_store(cfg)?;
    let deleted = store.clear_chat(user_id).context("Failed to clear chat history")?;
    println!("Deleted {deleted} message(s)");
    Ok(())
}
