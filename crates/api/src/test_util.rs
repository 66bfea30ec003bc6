//! Test fixtures: scripted completions, token minting and app state wiring

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowaudit_billing::testing::ScriptedBillingProvider;
use flowaudit_billing::BillingService;
use flowaudit_shared::InMemoryStore;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use time::OffsetDateTime;

use crate::auth::{Claims, IdentityVerifier};
use crate::config::Config;
use crate::llm::{CompletionError, CompletionProvider, CompletionRequest};
use crate::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-unit-tests";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PRICE_ID: &str = "price_pro_test";
pub const TEST_APP_URL: &str = "https://app.flowaudit.test";

/// Completion provider that replays queued responses in order
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Transport("no scripted response".to_string())))
    }
}

/// A well-formed completion body
pub fn valid_completion() -> String {
    json!({
        "analysis": "## Current Process\nLeads are copied by hand.\n\n## Time Saved\n~3 hours/week",
        "workflow": {
            "name": "X",
            "nodes": [
                { "name": "Facebook Lead Ads Trigger", "type": "n8n-nodes-base.facebookLeadAdsTrigger", "position": [250, 300], "parameters": {} },
                { "name": "Google Sheets", "type": "n8n-nodes-base.googleSheets", "position": [450, 300], "parameters": {} },
                { "name": "HubSpot", "type": "n8n-nodes-base.hubspot", "position": [650, 300], "parameters": {} },
                { "name": "Slack", "type": "n8n-nodes-base.slack", "position": [850, 300], "parameters": {} },
                { "name": "Set", "type": "n8n-nodes-base.set", "position": [1050, 300], "parameters": {} }
            ],
            "connections": {}
        }
    })
    .to_string()
}

/// HS256 session token signed with [`TEST_JWT_SECRET`]
pub fn mint_token(sub: &str, email: Option<&str>, exp_offset_secs: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        email: email.map(String::from),
        exp: OffsetDateTime::now_utc().unix_timestamp() + exp_offset_secs,
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = [
        ("DATABASE_URL", "postgres://localhost/flowaudit_test"),
        ("AUTH_JWT_SECRET", TEST_JWT_SECRET),
        ("OPENAI_API_KEY", "sk-test"),
        ("APP_URL", TEST_APP_URL),
    ]
    .into_iter()
    .collect();
    Config::from_lookup(|name: &str| vars.get(name).map(|v| v.to_string())).unwrap()
}

/// App state over in-memory collaborators
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub completion: Arc<ScriptedCompletion>,
    pub billing: Option<Arc<ScriptedBillingProvider>>,
}

impl TestApp {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self::build(responses, true)
    }

    pub fn without_billing(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self::build(responses, false)
    }

    fn build(responses: Vec<Result<String, CompletionError>>, billing: bool) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let completion = Arc::new(ScriptedCompletion::new(responses));
        let provider = billing.then(|| Arc::new(ScriptedBillingProvider::new()));

        let billing_service = provider.as_ref().map(|provider| {
            Arc::new(BillingService::with_provider(
                provider.clone(),
                store.clone(),
                TEST_WEBHOOK_SECRET,
                TEST_PRICE_ID,
                TEST_APP_URL,
            ))
        });

        let state = AppState::from_parts(
            test_config(),
            store.clone(),
            IdentityVerifier::from_secret(TEST_JWT_SECRET.as_bytes()),
            completion.clone(),
            billing_service,
        );

        Self {
            state,
            store,
            completion,
            billing: provider,
        }
    }
}
