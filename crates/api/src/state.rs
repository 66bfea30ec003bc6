//! Application state

use std::sync::Arc;

use flowaudit_billing::{BillingService, EntitlementGate, UsageCounter};
use flowaudit_shared::AccountStore;

use crate::{
    auth::{AuthError, AuthState, IdentityVerifier},
    config::{AuthKey, Config},
    generation::{GenerationService, ModelConfig},
    llm::{CompletionProvider, OpenAiClient},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn AccountStore>,
    pub verifier: Arc<IdentityVerifier>,
    pub gate: EntitlementGate,
    pub usage: UsageCounter,
    pub generation: GenerationService,
    /// Stripe-backed billing (None when billing is disabled or unconfigured)
    pub billing: Option<Arc<BillingService>>,
}

impl AppState {
    /// Build the production state: OpenAI completions and Stripe billing as
    /// configured
    pub fn new(config: Config, store: Arc<dyn AccountStore>) -> Result<Self, AuthError> {
        let mut verifier = IdentityVerifier::from_auth_key(&config.auth_key)?;
        if let Some(issuer) = &config.auth_issuer {
            verifier.set_issuer(issuer);
            tracing::info!(issuer = %issuer, "Identity token issuer validation enabled");
        }
        match config.auth_key {
            AuthKey::RsaPem(_) => tracing::info!("Identity tokens verified with RS256 public key"),
            AuthKey::Secret(_) => {
                tracing::warn!("Identity tokens verified with HS256 shared secret (development mode)")
            }
        }

        let completion: Arc<dyn CompletionProvider> = Arc::new(OpenAiClient::new(
            &config.openai_base_url,
            &config.openai_api_key,
        ));
        tracing::info!(
            pro_model = %config.pro_model,
            free_model = %config.free_model,
            "Completion client initialized"
        );

        let billing = if !config.enable_billing {
            tracing::info!("Billing disabled via config (ENABLE_BILLING=false)");
            None
        } else if let Some(stripe) = &config.stripe {
            let service = BillingService::new(stripe.clone(), store.clone(), &config.app_url);
            tracing::info!("Stripe billing service initialized");
            Some(Arc::new(service))
        } else {
            tracing::warn!(
                "Stripe billing not configured (missing STRIPE_SECRET_KEY, STRIPE_WEBHOOK_SECRET or STRIPE_PRO_PRICE_ID)"
            );
            None
        };

        Ok(Self::from_parts(config, store, verifier, completion, billing))
    }

    /// Assemble state from already-built collaborators
    pub fn from_parts(
        config: Config,
        store: Arc<dyn AccountStore>,
        verifier: IdentityVerifier,
        completion: Arc<dyn CompletionProvider>,
        billing: Option<Arc<BillingService>>,
    ) -> Self {
        let gate = EntitlementGate::new(store.clone(), config.free_audit_limit);
        tracing::info!(free_limit = config.free_audit_limit, "Entitlement gate initialized");

        let generation = GenerationService::new(
            store.clone(),
            gate.clone(),
            completion,
            ModelConfig {
                pro: config.pro_model.clone(),
                free: config.free_model.clone(),
            },
        );

        Self {
            usage: UsageCounter::new(store.clone()),
            config,
            store,
            verifier: Arc::new(verifier),
            gate,
            generation,
            billing,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            verifier: self.verifier.clone(),
        }
    }

    pub fn billing_service(&self) -> Option<&Arc<BillingService>> {
        self.billing.as_ref()
    }
}
