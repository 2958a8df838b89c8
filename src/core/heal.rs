//! Heal Worker (spec §4.8): a three-phase pipeline — diagnose with a local
//! model, research with a cloud model (falling back through a configured
//! provider list), then propose a fix with a local model — grounded on
//! `original_source/aratta/resilience/heal_worker.py`, including its exact
//! prompts' intent, JSON reply schemas, and fallback behavior.

use serde::{Deserialize, Serialize};

use crate::core::health::AdapterError;
use crate::core::reload::{FixApplication, FixStatus, ReloadManager};
use crate::core::router::Router;
use crate::core::types::{ChatRequest, Message};
use crate::utils::error::Result;

const DIAGNOSE_PROMPT: &str = "\
You are diagnosing a repeated error from an AI provider adapter. Given the \
error history below, decide whether this looks transient (rate limit, \
timeout, connection drop) or a real mismatch between what the adapter \
sends and what the provider now expects (a renamed field, a changed \
streaming format, a deprecated parameter). Reply as JSON: \
{\"is_transient\": bool, \"diagnosis\": string, \"search_queries\": [string], \
\"what_to_look_for\": string}.";

const FIX_PROMPT: &str = "\
You are proposing a fix for an AI provider adapter based on a diagnosis and \
research. Reply as JSON: {\"fix_type\": string, \"confidence\": number between \
0 and 1, \"change_summary\": string, \"fix_code\": string or null, \
\"reasoning\": string}.";

/// Research never finds anything better than this when every fallback
/// provider in turn fails or returns nothing useful.
const NO_DOCUMENTATION_FOUND: &str = "No current documentation found.";

/// Research and diagnosis text are truncated before being fed to the fix
/// phase so a single heal cycle can't blow the local model's context.
const MAX_CONTEXT_CHARS: usize = 6000;

#[derive(Debug, Clone, Deserialize)]
struct Diagnosis {
    is_transient: bool,
    diagnosis: String,
    search_queries: Vec<String>,
    what_to_look_for: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProposedFix {
    fix_type: String,
    confidence: f32,
    change_summary: String,
    fix_code: Option<String>,
    reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealOutcome {
    NoFixNeeded,
    FixProposed,
    AuthError,
    TransientError,
    HealError,
}

pub struct HealWorker {
    local_model: String,
    research_model: String,
    research_fallback: Vec<String>,
}

impl HealWorker {
    pub fn new(local_model: String, research_model: String, research_fallback: Vec<String>) -> Self {
        HealWorker { local_model, research_model, research_fallback }
    }

    pub async fn heal(
        &self,
        router: &Router,
        reload_manager: &ReloadManager,
        provider: &str,
        errors: &[AdapterError],
    ) -> Result<HealOutcome> {
        match self.run(router, reload_manager, provider, errors).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let message = error.to_string().to_lowercase();
                Ok(if message.contains("auth") || message.contains("401") || message.contains("key") {
                    HealOutcome::AuthError
                } else if message.contains("timeout") || message.contains("connect") {
                    HealOutcome::TransientError
                } else {
                    HealOutcome::HealError
                })
            }
        }
    }

    async fn run(
        &self,
        router: &Router,
        reload_manager: &ReloadManager,
        provider: &str,
        errors: &[AdapterError],
    ) -> Result<HealOutcome> {
        let diagnosis = match self.diagnose(router, provider, errors).await? {
            Some(diagnosis) => diagnosis,
            // Unparseable diagnose reply: spec §4.8 "JSON extraction" falls
            // back to a conservative no-op proposal rather than erroring out
            // with no record at all.
            None => return self.submit_fix(reload_manager, provider, conservative_fix()).await,
        };
        if diagnosis.is_transient {
            return Ok(HealOutcome::NoFixNeeded);
        }

        let research = self.research(router, provider, &diagnosis).await;
        let fix = self
            .propose_fix(router, provider, &diagnosis, &research)
            .await?
            .unwrap_or_else(conservative_fix);

        self.submit_fix(reload_manager, provider, fix).await
    }

    /// Dispatches on `fix.fix_type` (spec §4.7 step 4) and submits the
    /// resulting [`FixApplication`] to the Reload Manager. A `config_change`
    /// whose `fix_code` carries a parseable `{base_url?, default_model?}`
    /// object becomes a real [`crate::core::registry::ProviderOverride`]
    /// proposal; every other fix type (including `no_fix_needed`,
    /// `code_patch`, `workaround`, and anything unrecognized) is recorded
    /// with no config change, matching the "propose only" contract.
    async fn submit_fix(&self, reload_manager: &ReloadManager, provider: &str, fix: ProposedFix) -> Result<HealOutcome> {
        let (proposed_base_url, proposed_default_model) = config_override_from(&fix);
        let outcome = if fix.fix_type == "no_fix_needed" { HealOutcome::NoFixNeeded } else { HealOutcome::FixProposed };
        reload_manager
            .propose_fix(FixApplication {
                provider: provider.to_string(),
                status: FixStatus::Pending,
                confidence: fix.confidence,
                change_summary: fix.change_summary,
                proposed_base_url,
                proposed_default_model,
                code_changed: false,
                created_at: chrono::Utc::now(),
            })
            .await?;
        Ok(outcome)
    }

    /// Returns `Ok(None)` when the model replied but the reply wasn't
    /// parseable JSON; a transport/provider failure from [`Self::ask`]
    /// still propagates as `Err`.
    async fn diagnose(&self, router: &Router, provider: &str, errors: &[AdapterError]) -> Result<Option<Diagnosis>> {
        let history = errors
            .iter()
            .map(|e| format!("- {}", e.message))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("{DIAGNOSE_PROMPT}\n\nProvider: {provider}\nRecent errors:\n{history}");
        let reply = self.ask(router, &self.local_model, &prompt).await?;
        Ok(parse_json(&reply))
    }

    async fn research(&self, router: &Router, provider: &str, diagnosis: &Diagnosis) -> String {
        let prompt = format!(
            "Research these queries for an AI provider API change: {:?}. Focus on: {}",
            diagnosis.search_queries, diagnosis.what_to_look_for
        );
        let candidates = std::iter::once(self.research_model.clone())
            .chain(self.research_fallback.iter().filter(|p| p.as_str() != provider).cloned());
        for model in candidates {
            if let Ok(reply) = self.ask(router, &model, &prompt).await {
                if !reply.trim().is_empty() {
                    return reply.chars().take(MAX_CONTEXT_CHARS).collect();
                }
            }
        }
        NO_DOCUMENTATION_FOUND.to_string()
    }

    /// Returns `Ok(None)` when the model replied but the reply wasn't
    /// parseable JSON; a transport/provider failure from [`Self::ask`]
    /// still propagates as `Err`.
    async fn propose_fix(
        &self,
        router: &Router,
        _provider: &str,
        diagnosis: &Diagnosis,
        research: &str,
    ) -> Result<Option<ProposedFix>> {
        let prompt = format!(
            "{FIX_PROMPT}\n\nDiagnosis: {}\nResearch: {}",
            diagnosis.diagnosis,
            research.chars().take(MAX_CONTEXT_CHARS).collect::<String>()
        );
        let reply = self.ask(router, &self.local_model, &prompt).await?;
        Ok(parse_json(&reply))
    }

    /// Routes a heal-internal prompt through the gateway's own chat path —
    /// the heal loop is just another caller of [`Router::chat`].
    async fn ask(&self, router: &Router, model: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: Some(1024),
            temperature: Some(0.0),
            tools: vec![],
            tool_choice: None,
            stream: false,
            thinking_budget: None,
        };
        let response = router.chat(request).await?;
        Ok(response.content.iter().filter_map(|c| c.as_text()).collect::<Vec<_>>().join(""))
    }
}

/// The fallback proposal for any JSON-extraction failure in the diagnose
/// or fix phases (spec §4.8): a no-op, low-confidence fix rather than a
/// silently dropped heal cycle.
fn conservative_fix() -> ProposedFix {
    ProposedFix {
        fix_type: "no_fix_needed".to_string(),
        confidence: 0.1,
        change_summary: "heal model reply was not parseable JSON".to_string(),
        fix_code: None,
        reasoning: "falling back to a conservative no-op after a JSON parse failure".to_string(),
    }
}

/// Extracts `{base_url?, default_model?}` out of a `config_change` fix's
/// `fix_code` so it can become a real [`crate::core::registry::ProviderOverride`]
/// proposal (spec §4.7 step 4). Any other `fix_type`, a missing `fix_code`,
/// or unparseable `fix_code` yields `(None, None)` — recorded with no
/// config change, per the "propose only" contract for `code_patch` and
/// `workaround`.
fn config_override_from(fix: &ProposedFix) -> (Option<String>, Option<String>) {
    if fix.fix_type != "config_change" {
        return (None, None);
    }
    let Some(code) = fix.fix_code.as_deref() else { return (None, None) };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(code) else { return (None, None) };
    let base_url = value.get("base_url").and_then(|v| v.as_str()).map(str::to_string);
    let default_model = value.get("default_model").and_then(|v| v.as_str()).map(str::to_string);
    (base_url, default_model)
}

/// Extracts JSON from a reply that may be wrapped in a ```json fence.
/// Falls back to scanning for the first `{...}` span if fencing is absent.
fn parse_json<T: for<'de> Deserialize<'de>>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    let candidate = if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        after.split("```").next().unwrap_or(after).trim()
    } else {
        trimmed
    };
    if let Ok(value) = serde_json::from_str::<T>(candidate) {
        return Some(value);
    }
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    serde_json::from_str(&candidate[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let text = "here you go:\n```json\n{\"is_transient\": true, \"diagnosis\": \"rate limited\", \"search_queries\": [], \"what_to_look_for\": \"\"}\n```";
        let parsed: Diagnosis = parse_json(text).unwrap();
        assert!(parsed.is_transient);
    }

    #[test]
    fn parses_bare_json_without_fence() {
        let text = r#"{"fix_type": "field_rename", "confidence": 0.9, "change_summary": "x", "fix_code": null, "reasoning": "y"}"#;
        let parsed: ProposedFix = parse_json(text).unwrap();
        assert_eq!(parsed.fix_type, "field_rename");
    }

    #[test]
    fn unparseable_reply_yields_no_diagnosis() {
        let parsed: Option<Diagnosis> = parse_json("not json at all");
        assert!(parsed.is_none());
    }

    #[test]
    fn conservative_fix_is_no_fix_needed_with_low_confidence() {
        let fix = conservative_fix();
        assert_eq!(fix.fix_type, "no_fix_needed");
        assert_eq!(fix.confidence, 0.1);
    }

    #[test]
    fn config_change_with_valid_fix_code_yields_an_override() {
        let fix = ProposedFix {
            fix_type: "config_change".to_string(),
            confidence: 0.9,
            change_summary: "point at the v2 endpoint".to_string(),
            fix_code: Some(r#"{"base_url": "https://api.example.com/v2", "default_model": "m2"}"#.to_string()),
            reasoning: "the v1 endpoint was deprecated".to_string(),
        };
        let (base_url, default_model) = config_override_from(&fix);
        assert_eq!(base_url.as_deref(), Some("https://api.example.com/v2"));
        assert_eq!(default_model.as_deref(), Some("m2"));
    }

    #[test]
    fn config_change_with_unparseable_fix_code_yields_no_override() {
        let fix = ProposedFix {
            fix_type: "config_change".to_string(),
            confidence: 0.9,
            change_summary: "x".to_string(),
            fix_code: Some("not json".to_string()),
            reasoning: "y".to_string(),
        };
        assert_eq!(config_override_from(&fix), (None, None));
    }

    #[test]
    fn code_patch_fix_type_never_yields_an_override() {
        let fix = ProposedFix {
            fix_type: "code_patch".to_string(),
            confidence: 0.9,
            change_summary: "x".to_string(),
            fix_code: Some(r#"{"base_url": "https://evil.example.com"}"#.to_string()),
            reasoning: "y".to_string(),
        };
        assert_eq!(config_override_from(&fix), (None, None));
    }
}
