//! Generation orchestrator: validated input in, persisted audit out

pub mod response;
pub mod validation;

use std::sync::Arc;

use flowaudit_billing::{BillingError, EntitlementGate, ModelTier};
use flowaudit_shared::{AccountStore, NewAudit, StoreError};
use serde_json::Value;
use uuid::Uuid;

use crate::llm::{prompt, CompletionError, CompletionProvider, CompletionRequest};

pub use response::{parse_completion, AuditDraft, ResponseError};
pub use validation::{validate_input, ValidationError, MAX_INPUT_CHARS, MIN_INPUT_CHARS};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("You have reached your limit of free audits. Please upgrade to Pro to generate more.")]
    UpgradeRequired,

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    InvalidResponse(#[from] ResponseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

/// Model names per tier
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub pro: String,
    pub free: String,
}

impl ModelConfig {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Pro => &self.pro,
            ModelTier::Free => &self.free,
        }
    }
}

/// Caller identity as verified at the request boundary
#[derive(Debug, Clone)]
pub struct Requester {
    pub identity_id: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct GeneratedAudit {
    pub audit_id: Uuid,
    pub analysis: String,
    pub workflow: Value,
}

#[derive(Clone)]
pub struct GenerationService {
    store: Arc<dyn AccountStore>,
    gate: EntitlementGate,
    completion: Arc<dyn CompletionProvider>,
    models: ModelConfig,
}

impl GenerationService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        gate: EntitlementGate,
        completion: Arc<dyn CompletionProvider>,
        models: ModelConfig,
    ) -> Self {
        Self {
            store,
            gate,
            completion,
            models,
        }
    }

    /// Run one generation.
    ///
    /// Validation and the entitlement gate both run before the completion
    /// call. No audit row is written unless the completion parses. A failed
    /// write after a successful completion loses the result.
    pub async fn generate(
        &self,
        requester: &Requester,
        raw_input: Option<&str>,
    ) -> Result<GeneratedAudit, GenerationError> {
        let input = validate_input(raw_input)?;

        let user = self
            .store
            .upsert_user(&requester.identity_id, &requester.email)
            .await?;

        let decision = self.gate.evaluate(user.id).await?;
        if !decision.allowed {
            tracing::info!(
                user_id = %user.id,
                audits_used = decision.entitlement.audits_used,
                "Free audit limit reached"
            );
            return Err(GenerationError::UpgradeRequired);
        }

        let model = self.models.model_for(decision.tier).to_string();
        tracing::info!(user_id = %user.id, model = %model, "Generating audit");

        let raw = self
            .completion
            .complete(CompletionRequest {
                system_prompt: prompt::SYSTEM_PROMPT.to_string(),
                user_prompt: prompt::user_prompt(&input),
                model,
                temperature: prompt::TEMPERATURE,
                max_tokens: prompt::MAX_TOKENS,
                json_response: true,
            })
            .await?;

        let draft = parse_completion(&raw).map_err(|e| {
            let preview: String = raw.chars().take(300).collect();
            tracing::error!(user_id = %user.id, error = %e, preview = %preview, "Unusable completion");
            e
        })?;

        let audit = self
            .store
            .insert_audit(NewAudit {
                user_id: user.id,
                original_input: input,
                analysis_report: draft.analysis,
                workflow_json: draft.workflow,
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            audit_id = %audit.id,
            total_audits = decision.entitlement.audits_used + 1,
            "Audit saved"
        );

        Ok(GeneratedAudit {
            audit_id: audit.id,
            analysis: audit.analysis_report,
            workflow: audit.workflow_json,
        })
    }
}
