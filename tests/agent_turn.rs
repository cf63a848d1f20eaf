//! Agent 回合端到端：脚本化 provider + 内存数据库

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use intentions::core::Actor;
use intentions::llm::{
    Completion, CompletionProvider, FailingProvider, FallbackProvider, LlmError, LoopingToolProvider,
    ScriptedProvider, ToolCall,
};
use intentions::react::{AgentEvent, TurnOutcome, MAX_ROUND_TRIPS};
use intentions::store::{StatusFilter, TaskStore};
use intentions::{Agent, WorkingDay};

fn store() -> Arc<TaskStore> {
    Arc::new(TaskStore::open_in_memory().unwrap())
}

fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args,
    }
}

#[tokio::test]
async fn runaway_provider_stops_with_full_audit_trail() {
    let store = store();
    let looping = Arc::new(LoopingToolProvider::new(
        "create_task",
        json!({"title": "Again", "date": "2025-02-03"}),
    ));
    let agent = Agent::new(
        store.clone(),
        WorkingDay::default(),
        FallbackProvider::single(looping.clone() as Arc<dyn CompletionProvider>),
    );

    let result = agent.chat(&Actor::new(1), "keep going", None).await.unwrap();
    assert_eq!(result.outcome, TurnOutcome::Exhausted);
    assert_eq!(looping.calls(), MAX_ROUND_TRIPS);
    assert_eq!(result.tool_executions.len(), MAX_ROUND_TRIPS);

    // 同标题同日期会重复创建，每轮一次
    let date = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
    assert_eq!(store.list_tasks(1, date, StatusFilter::All).unwrap().len(), MAX_ROUND_TRIPS);
    let audit = store.list_audit(Some(1)).unwrap();
    assert_eq!(audit.len(), MAX_ROUND_TRIPS);
    assert!(audit.iter().all(|a| a.tool == "create_task" && a.success));
}

#[tokio::test]
async fn multi_tool_turn_reports_domain_errors_to_provider() {
    let store = store();
    let scripted = Arc::new(ScriptedProvider::new(
        "mock",
        vec![
            Completion::tools(vec![
                call("c1", "create_task", json!({"title": "Taxes", "date": "2025-02-03", "froggy": true})),
                call("c2", "create_task", json!({"title": "Gym", "date": "2025-02-03", "froggy": true})),
            ]),
            Completion::text("Taxes is your frog; Gym was added without the flag."),
        ],
    ));
    let agent = Agent::new(
        store.clone(),
        WorkingDay::default(),
        FallbackProvider::single(scripted.clone() as Arc<dyn CompletionProvider>),
    );

    let result = agent.chat(&Actor::new(1), "plan my day", None).await.unwrap();
    assert_eq!(result.outcome, TurnOutcome::Answered);
    assert_eq!(result.rounds, 2);
    assert!(result.tool_executions[0].envelope.success);
    let rejected = &result.tool_executions[1].envelope;
    assert!(!rejected.success);
    assert!(rejected.error.as_deref().unwrap().contains("A frog already exists"));

    let fed_back = &scripted.seen()[1];
    let tool_msgs: Vec<_> = fed_back.iter().filter(|m| m.tool_call_id.is_some()).collect();
    assert_eq!(tool_msgs.len(), 2);
    assert!(tool_msgs[1].content.contains("\"success\":false"));

    let audit = store.list_audit(Some(1)).unwrap();
    assert_eq!(audit.iter().filter(|a| !a.success).count(), 1);
}

#[tokio::test]
async fn unavailable_assistant_is_user_visible() {
    let agent = Agent::new(
        store(),
        WorkingDay::default(),
        FallbackProvider::new(
            Arc::new(FailingProvider::new("primary", LlmError::Api { status: 503, body: "overloaded".into() })),
            Some(Arc::new(FailingProvider::new("secondary", LlmError::Http("refused".into())))),
            true,
        ),
    );
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let result = agent.chat(&Actor::new(1), "hello", Some(&tx)).await.unwrap();
    drop(tx);

    assert_eq!(result.outcome, TurnOutcome::ProviderUnavailable);
    assert!(result.response.contains("unavailable"));
    assert_eq!(
        result.error,
        Some(LlmError::Api { status: 503, body: "overloaded".into() })
    );

    let mut saw_error = false;
    while let Some(ev) = rx.recv().await {
        if matches!(ev, AgentEvent::Error { .. }) {
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn history_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("intentions.db");
    let actor = Actor::new(3);
    {
        let agent = Agent::new(
            Arc::new(TaskStore::open(&path).unwrap()),
            WorkingDay::default(),
            FallbackProvider::single(Arc::new(ScriptedProvider::new(
                "mock",
                vec![Completion::text("Got it, the frog is taxes.")],
            ))),
        );
        agent.chat(&actor, "my frog is taxes", None).await.unwrap();
    }

    let scripted = Arc::new(ScriptedProvider::new("mock", vec![Completion::text("Taxes.")]));
    let agent = Agent::new(
        Arc::new(TaskStore::open(&path).unwrap()),
        WorkingDay::default(),
        FallbackProvider::single(scripted.clone() as Arc<dyn CompletionProvider>),
    );
    agent.chat(&actor, "what was my frog?", None).await.unwrap();

    let seen = &scripted.seen()[0];
    assert!(seen.iter().any(|m| m.content == "my frog is taxes"));
    assert!(seen.iter().any(|m| m.content == "Got it, the frog is taxes."));
    assert_eq!(seen.last().unwrap().content, "what was my frog?");
    assert_eq!(agent.history(&actor).unwrap().len(), 4);
}
