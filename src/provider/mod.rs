//! Provider dialect compilers and transport interfaces.
//!
//! Each messaging provider speaks its own template-submission dialect
//! and approval-status vocabulary. A [`ProviderCompiler`] translates the
//! canonical model into the provider's payload and folds the provider's
//! raw status into the canonical one; a [`ProviderClient`] is the
//! injected transport that actually talks to the provider. Providers are
//! selected through a lookup table keyed by normalized provider name, so
//! adding one is a pure-addition change.

pub mod example;
pub mod gupshup;
pub mod karix;
pub mod meta;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::template::model::{CanonicalTemplate, ProviderApprovalStatus};

pub use gupshup::GupshupCompiler;
pub use karix::KarixCompiler;
pub use meta::MetaCompiler;

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Meta,
    Karix,
    Gupshup,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Karix => "karix",
            Self::Gupshup => "gupshup",
        }
    }

    /// Case-insensitive lookup by provider name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "meta" => Some(Self::Meta),
            "karix" => Some(Self::Karix),
            "gupshup" => Some(Self::Gupshup),
            _ => None,
        }
    }
}

/// Per-channel provider credentials and settings.
///
/// Which fields are required depends on the provider; compilers surface
/// a missing field as a validation-class error before any network call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Explicit provider name; when absent the provider is inferred from
    /// the channel and the config keys present.
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub business_account_id: Option<String>,

    #[serde(default)]
    pub whatsapp_business_account_id: Option<String>,

    #[serde(default)]
    pub sender_id: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub app_id: Option<String>,
}

/// Resolve the provider for a channel: explicit name wins, otherwise the
/// provider is inferred from channel "WhatsApp" plus the config keys
/// present (`api_key` means Karix, `access_token` + `business_account_id`
/// mean Meta).
pub fn resolve_provider(channel: &str, config: &ProviderConfig) -> Result<ProviderKind, AppError> {
    if let Some(name) = &config.provider {
        return ProviderKind::from_name(name)
            .ok_or_else(|| AppError::Validation(format!("unknown provider: {}", name)));
    }

    if channel.eq_ignore_ascii_case("whatsapp") {
        if config.api_key.is_some() {
            return Ok(ProviderKind::Karix);
        }
        if config.access_token.is_some() && config.business_account_id.is_some() {
            return Ok(ProviderKind::Meta);
        }
    }

    Err(AppError::Validation(format!(
        "cannot resolve a provider for channel {}",
        channel
    )))
}

/// Error from a provider transport call. `body` carries the raw error
/// response when the transport got one, so callers can extract the best
/// human-readable message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ProviderCallError {
    pub message: String,
    pub body: Option<Value>,
}

impl ProviderCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body(message: impl Into<String>, body: Value) -> Self {
        Self {
            message: message.into(),
            body: Some(body),
        }
    }

    /// The best human-readable message: a Meta-style `error_user_msg`
    /// from the response body when present, the transport message
    /// otherwise.
    pub fn human_message(&self) -> String {
        match &self.body {
            Some(body) if body.get("error").is_some() => parse_error_message(body),
            _ => self.message.clone(),
        }
    }
}

/// Extract the best human-readable message from a provider error body.
///
/// Meta-style responses carry `error.error_user_msg`; anything else gets
/// the generic message.
pub fn parse_error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("error_user_msg"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "provider request failed".to_string())
}

/// Result of a successful template submission.
#[derive(Debug, Clone)]
pub struct ProviderSubmission {
    pub template_id: String,
    pub template_name: Option<String>,
}

/// Raw approval status as returned by a provider, before canonical
/// mapping. `reason` carries Karix's `template_status_reason` or any
/// equivalent rejection detail.
#[derive(Debug, Clone)]
pub struct RawTemplateStatus {
    pub status: String,
    pub reason: Option<String>,
}

/// Injected transport to one provider. Implementations are expected to
/// apply a bounded timeout per call.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Submit a compiled template payload.
    async fn submit_template(
        &self,
        payload: &Value,
        config: &ProviderConfig,
    ) -> Result<ProviderSubmission, ProviderCallError>;

    /// Query the provider-side approval status of a submitted template.
    async fn get_template_status(
        &self,
        provider_template_id: &str,
        config: &ProviderConfig,
    ) -> Result<RawTemplateStatus, ProviderCallError>;

    /// Delete a submitted template on the provider side.
    async fn delete_template(
        &self,
        provider_template_id: &str,
        config: &ProviderConfig,
    ) -> Result<(), ProviderCallError>;

    /// Upload a media asset and return the provider media handle
    /// (Karix side channel).
    async fn upload_media(
        &self,
        media_url: &str,
        media_type: &str,
        config: &ProviderConfig,
    ) -> Result<String, ProviderCallError>;
}

impl std::fmt::Debug for dyn ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ProviderClient")
    }
}

/// Compiles the canonical model into one provider's dialect and maps
/// that provider's status vocabulary onto the canonical one.
#[async_trait]
pub trait ProviderCompiler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Translate a canonical template into the provider submission
    /// payload. The client is available for side channels (media upload);
    /// most compilers never touch it.
    async fn compile(
        &self,
        template: &CanonicalTemplate,
        config: &ProviderConfig,
        client: &dyn ProviderClient,
    ) -> Result<Value, AppError>;

    /// Map a raw provider status onto the canonical vocabulary, with an
    /// optional rejection reason.
    fn map_status(&self, raw: &RawTemplateStatus) -> (ProviderApprovalStatus, Option<String>);
}

/// Map the Meta/Gupshup-style status vocabulary: APPROVED, REJECTED,
/// anything else (PENDING included) stays pending.
pub(crate) fn map_status_standard(
    raw: &RawTemplateStatus,
) -> (ProviderApprovalStatus, Option<String>) {
    match raw.status.to_uppercase().as_str() {
        "APPROVED" => (ProviderApprovalStatus::Approved, None),
        "REJECTED" => (ProviderApprovalStatus::Rejected, raw.reason.clone()),
        _ => (ProviderApprovalStatus::Pending, None),
    }
}

/// Lookup table of compilers and injected clients, keyed by provider.
pub struct ProviderRegistry {
    compilers: HashMap<ProviderKind, Arc<dyn ProviderCompiler>>,
    clients: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    /// Registry with all supported compilers and no transports.
    pub fn new() -> Self {
        let mut compilers: HashMap<ProviderKind, Arc<dyn ProviderCompiler>> = HashMap::new();
        compilers.insert(ProviderKind::Meta, Arc::new(MetaCompiler));
        compilers.insert(ProviderKind::Karix, Arc::new(KarixCompiler));
        compilers.insert(ProviderKind::Gupshup, Arc::new(GupshupCompiler));

        Self {
            compilers,
            clients: HashMap::new(),
        }
    }

    /// Register the injected transport for one provider.
    pub fn register_client(&mut self, kind: ProviderKind, client: Arc<dyn ProviderClient>) {
        self.clients.insert(kind, client);
    }

    pub fn compiler(&self, kind: ProviderKind) -> Arc<dyn ProviderCompiler> {
        // All kinds are registered in new(); the map is exhaustive.
        self.compilers
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| unreachable!("compiler registered for every ProviderKind"))
    }

    pub fn client(&self, kind: ProviderKind) -> Result<Arc<dyn ProviderClient>, AppError> {
        self.clients.get(&kind).cloned().ok_or_else(|| {
            AppError::Provider {
                provider: kind.as_str().to_string(),
                message: "no transport client registered".to_string(),
            }
        })
    }

    /// Resolve a stored provider name (case-insensitive) back to a kind,
    /// falling back to channel-based inference for WhatsApp channels.
    pub fn resolve_stored(
        &self,
        provider_name: &str,
        channel: &str,
        config: &ProviderConfig,
    ) -> Result<ProviderKind, AppError> {
        if let Some(kind) = ProviderKind::from_name(provider_name) {
            return Ok(kind);
        }
        resolve_provider(channel, config)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_kind_from_name_case_insensitive() {
        assert_eq!(ProviderKind::from_name("Meta"), Some(ProviderKind::Meta));
        assert_eq!(ProviderKind::from_name("KARIX"), Some(ProviderKind::Karix));
        assert_eq!(
            ProviderKind::from_name(" gupshup "),
            Some(ProviderKind::Gupshup)
        );
        assert_eq!(ProviderKind::from_name("twilio"), None);
    }

    #[test]
    fn test_resolve_provider_explicit_name_wins() {
        let config = ProviderConfig {
            provider: Some("gupshup".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_provider("WhatsApp", &config).unwrap(),
            ProviderKind::Gupshup
        );
    }

    #[test]
    fn test_resolve_provider_infers_karix_from_api_key() {
        let config = ProviderConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_provider("whatsapp", &config).unwrap(),
            ProviderKind::Karix
        );
    }

    #[test]
    fn test_resolve_provider_infers_meta_from_token_and_account() {
        let config = ProviderConfig {
            access_token: Some("t".to_string()),
            business_account_id: Some("b".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_provider("WhatsApp", &config).unwrap(),
            ProviderKind::Meta
        );
    }

    #[test]
    fn test_resolve_provider_fails_without_hints() {
        let config = ProviderConfig::default();
        assert!(resolve_provider("SMS", &config).is_err());
    }

    #[test]
    fn test_parse_error_message_meta_style() {
        let body = json!({"error": {"error_user_msg": "Name already in use"}});
        assert_eq!(parse_error_message(&body), "Name already in use");
    }

    #[test]
    fn test_parse_error_message_generic() {
        let body = json!({"status": 500});
        assert_eq!(parse_error_message(&body), "provider request failed");
    }

    #[test]
    fn test_standard_status_mapping() {
        let approved = RawTemplateStatus {
            status: "APPROVED".to_string(),
            reason: None,
        };
        assert_eq!(
            map_status_standard(&approved).0,
            ProviderApprovalStatus::Approved
        );

        let rejected = RawTemplateStatus {
            status: "REJECTED".to_string(),
            reason: Some("Policy violation".to_string()),
        };
        let (status, reason) = map_status_standard(&rejected);
        assert_eq!(status, ProviderApprovalStatus::Rejected);
        assert_eq!(reason.as_deref(), Some("Policy violation"));

        let pending = RawTemplateStatus {
            status: "PENDING".to_string(),
            reason: None,
        };
        assert_eq!(
            map_status_standard(&pending).0,
            ProviderApprovalStatus::Pending
        );

        let unknown = RawTemplateStatus {
            status: "SOMETHING_ELSE".to_string(),
            reason: None,
        };
        assert_eq!(
            map_status_standard(&unknown).0,
            ProviderApprovalStatus::Pending
        );
    }

    #[test]
    fn test_registry_has_all_compilers() {
        let registry = ProviderRegistry::new();
        assert_eq!(registry.compiler(ProviderKind::Meta).name(), "meta");
        assert_eq!(registry.compiler(ProviderKind::Karix).name(), "karix");
        assert_eq!(registry.compiler(ProviderKind::Gupshup).name(), "gupshup");
    }

    #[test]
    fn test_registry_missing_client_is_provider_error() {
        let registry = ProviderRegistry::new();
        let err = registry.client(ProviderKind::Meta).unwrap_err();
        assert!(matches!(err, AppError::Provider { .. }));
    }
}
