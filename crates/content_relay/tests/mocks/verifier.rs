use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use content_relay::{auth::TokenVerifier, Error};

/// Accepts a fixed set of `token -> user id` pairs.
#[derive(Clone, Default)]
pub struct MockVerifier {
    pub tokens: HashMap<String, String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockVerifier {
    pub fn new(tokens: &[(&str, &str)]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|(token, user)| (token.to_string(), user.to_string()))
                .collect(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TokenVerifier for MockVerifier {
    async fn verify(&self, token: &str) -> Result<String, Error> {
        self.calls.lock().unwrap().push(token.to_string());
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("invalid or expired token".into()))
    }
}
