#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use authgate::auth::JwtKeys;
use authgate::config::Environment;
use authgate::protection::{Decision, ProtectionClient, ProtectionError, RequestDetails, Rule};
use authgate::repo::inmem::InMemUserRepo;
use authgate::AppState;

pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

/// Decision client that answers with a canned verdict and records every call.
pub struct MockProtection {
    verdict: Result<Decision, String>,
    pub calls: Mutex<Vec<(RequestDetails, Vec<Rule>)>>,
}

impl MockProtection {
    pub fn answering(decision: Decision) -> Arc<Self> {
        Arc::new(Self { verdict: Ok(decision), calls: Mutex::new(Vec::new()) })
    }

    pub fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self { verdict: Err(msg.to_string()), calls: Mutex::new(Vec::new()) })
    }

    pub fn last_rules(&self) -> Vec<Rule> {
        self.calls.lock().unwrap().last().map(|(_, r)| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ProtectionClient for MockProtection {
    async fn protect(&self, details: &RequestDetails, rules: &[Rule]) -> Result<Decision, ProtectionError> {
        self.calls.lock().unwrap().push((details.clone(), rules.to_vec()));
        self.verdict.clone().map_err(ProtectionError::Transport)
    }
}

pub fn keys() -> JwtKeys {
    JwtKeys::new(SECRET)
}

pub fn state(repo: InMemUserRepo) -> AppState {
    AppState { repo: Arc::new(repo), jwt: keys(), environment: Environment::Test }
}
