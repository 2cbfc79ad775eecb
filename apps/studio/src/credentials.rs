//! Credential Gate: decides whether a usable API key is currently selected.
//!
//! The video tracker consults a [`CredentialGate`] before submitting and
//! invalidates it when the remote side rejects the key. The gate is injected
//! into the tracker rather than looked up globally.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{info, warn};

#[async_trait]
pub trait CredentialGate: Send + Sync {
    /// Side-effect-free check that a credential is selected.
    async fn has_usable_credential(&self) -> bool;

    /// Triggers the selection flow. Callers assume success without
    /// confirmation; a bad key shows up later as a `CREDENTIAL_INVALID` job.
    async fn request_credential_selection(&self);

    /// Marks the current credential unusable.
    fn invalidate(&self);
}

/// In-process gate holding the selected Gemini API key.
///
/// `configured` is the key supplied at startup (if any); the selection flow
/// re-arms it. A key selected explicitly through [`ApiKeyGate::select`]
/// replaces it until invalidated.
#[derive(Debug)]
pub struct ApiKeyGate {
    configured: Option<String>,
    selected: RwLock<Option<String>>,
}

impl ApiKeyGate {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            selected: RwLock::new(configured.clone()),
            configured,
        }
    }

    /// Selects a key explicitly. Blank keys are ignored.
    pub fn select(&self, api_key: &str) -> bool {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return false;
        }
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = Some(api_key.to_string());
        info!("API key selected");
        true
    }

    /// The key to send with the next request, if one is selected.
    pub fn current_key(&self) -> Option<String> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialGate for ApiKeyGate {
    async fn has_usable_credential(&self) -> bool {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    async fn request_credential_selection(&self) {
        match &self.configured {
            Some(key) => {
                *self.selected.write().unwrap_or_else(PoisonError::into_inner) = Some(key.clone());
                info!("Re-selected configured API key");
            }
            None => warn!("Credential selection requested but no API key is configured"),
        }
    }

    fn invalidate(&self) {
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = None;
        warn!("API key invalidated");
    }
}
