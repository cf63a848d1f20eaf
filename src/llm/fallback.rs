//! 主备 provider
//!
//! 每次调用独立决定：主失败且允许回退时立即尝试备；备也失败（或不允许回退、或没有备）时返回主的原始错误。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::traits::{Completion, CompletionProvider, LlmError};
use crate::memory::Message;
use crate::tools::ToolSpec;

/// 回退发生时的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNotice {
    pub primary: String,
    pub secondary: String,
    pub error: String,
}

pub struct FallbackProvider {
    primary: Arc<dyn CompletionProvider>,
    secondary: Option<Arc<dyn CompletionProvider>>,
    fallback_enabled: bool,
}

impl FallbackProvider {
    pub fn new(
        primary: Arc<dyn CompletionProvider>,
        secondary: Option<Arc<dyn CompletionProvider>>,
        fallback_enabled: bool,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback_enabled,
        }
    }

    /// 只有主 provider、不回退
    pub fn single(primary: Arc<dyn CompletionProvider>) -> Self {
        Self::new(primary, None, false)
    }

    /// 调用并返回是否发生了回退
    pub async fn complete_with_notice(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<(Completion, Option<FallbackNotice>), LlmError> {
        let primary_err = match self.primary.complete(messages, tools).await {
            Ok(c) => return Ok((c, None)),
            Err(e) => e,
        };
        let secondary = match (&self.secondary, self.fallback_enabled) {
            (Some(secondary), true) => secondary,
            _ => {
                tracing::error!(provider = self.primary.name(), error = %primary_err, "completion failed, no fallback");
                return Err(primary_err);
            }
        };

        tracing::warn!(
            primary = self.primary.name(),
            secondary = secondary.name(),
            error = %primary_err,
            "primary provider failed, falling back"
        );
        let notice = FallbackNotice {
            primary: self.primary.name().to_string(),
            secondary: secondary.name().to_string(),
            error: primary_err.to_string(),
        };
        match secondary.complete(messages, tools).await {
            Ok(c) => Ok((c, Some(notice))),
            Err(secondary_err) => {
                tracing::error!(
                    provider = secondary.name(),
                    error = %secondary_err,
                    "secondary provider failed too"
                );
                Err(primary_err)
            }
        }
    }
}

#[async_trait]
impl CompletionProvider for FallbackProvider {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Completion, LlmError> {
        self.complete_with_notice(messages, tools).await.map(|(c, _)| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{FailingProvider, ScriptedProvider};

    fn msgs() -> Vec<Message> {
        vec![Message::user("hi")]
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let secondary = Arc::new(ScriptedProvider::new("b", vec![Completion::text("from b")]));
        let p = FallbackProvider::new(
            Arc::new(ScriptedProvider::new("a", vec![Completion::text("from a")])),
            Some(secondary.clone() as Arc<dyn CompletionProvider>),
            true,
        );
        assert_eq!(p.complete(&msgs(), &[]).await.unwrap().text.as_deref(), Some("from a"));
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_when_enabled() {
        let p = FallbackProvider::new(
            Arc::new(FailingProvider::new("a", LlmError::Http("timeout".into()))),
            Some(Arc::new(ScriptedProvider::new("b", vec![Completion::text("from b")]))),
            true,
        );
        let (completion, notice) = p.complete_with_notice(&msgs(), &[]).await.unwrap();
        assert_eq!(completion.text.as_deref(), Some("from b"));
        let notice = notice.unwrap();
        assert_eq!(notice.primary, "a");
        assert_eq!(notice.secondary, "b");
    }

    #[tokio::test]
    async fn disabled_fallback_surfaces_primary_error() {
        let secondary = Arc::new(ScriptedProvider::new("b", vec![Completion::text("from b")]));
        let p = FallbackProvider::new(
            Arc::new(FailingProvider::new("a", LlmError::Http("down".into()))),
            Some(secondary.clone() as Arc<dyn CompletionProvider>),
            false,
        );
        assert_eq!(p.complete(&msgs(), &[]).await.unwrap_err(), LlmError::Http("down".into()));
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn secondary_failure_surfaces_original_error() {
        let p = FallbackProvider::new(
            Arc::new(FailingProvider::new("a", LlmError::Api { status: 500, body: "boom".into() })),
            Some(Arc::new(FailingProvider::new("b", LlmError::Http("also down".into())))),
            true,
        );
        assert_eq!(
            p.complete(&msgs(), &[]).await.unwrap_err(),
            LlmError::Api { status: 500, body: "boom".into() }
        );
    }
}
