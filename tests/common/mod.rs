use std::sync::Arc;

use blogpost_server::{AppState, Identity, MemoryStore, Settings, TokenService};

pub const SECRET: &str = "integration-test-secret";

pub fn test_state() -> AppState {
    let settings = Settings::from_toml(&format!("[auth]\njwt_secret = \"{}\"\n", SECRET))
        .expect("Failed to load test config");
    let tokens = TokenService::new(SECRET, None).expect("Failed to build token service");
    let store = Arc::new(MemoryStore::new());
    AppState::with_stores(settings, tokens, store.clone(), store)
        .expect("Failed to build app state")
}

/// Registers `username` directly through the credential store and returns a
/// bearer header value for it.
#[allow(dead_code)]
pub async fn registered(state: &AppState, username: &str, password: &str) -> String {
    let user = state
        .credentials
        .register(username, password)
        .await
        .expect("Failed to register test user");
    let token = state
        .tokens
        .issue(&Identity::from(&user))
        .expect("Failed to issue token");
    format!("Bearer {}", token)
}
