//! Identity & Crypto Service: process identity resolution,
//! message signing/verification, authorisation policy, and the combined
//! four-check `validate` used by the bus's publish path.

pub mod crypto;
pub mod identity;
pub mod policy;
pub mod token;

use tracing::warn;

use crate::bus::message::A2AMessage;
use crate::config::Config;
use crate::error::NavigatorResult;
use identity::{EnvIdentityProvider, IdentityCache, IdentityProvider, ServiceIdentity};

pub use crypto::SigningMode;
pub use token::{IdTokenClaims, PublicKeyProvider, TokenVerifier};

/// Result of [`IdentityService::validate`]: four independent checks, each
/// contributing 25 points to `security_score` when it passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// `true` only if every check passed.
    pub is_valid: bool,
    /// One entry per failed check, human-readable.
    pub issues: Vec<String>,
    /// `100 * (1 - failed_checks / 4)`.
    pub security_score: u8,
}

/// One audit-record reason. Never carries message payload data.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// The affected message id.
    pub message_id: String,
    /// Sender.
    pub from_agent: String,
    /// Recipient.
    pub to_agent: String,
    /// Taxonomy reason, e.g. `"unauthorised"`.
    pub reason: String,
}

fn emit_audit(record: &AuditRecord) {
    warn!(
        message_id = %record.message_id,
        from_agent = %record.from_agent,
        to_agent = %record.to_agent,
        reason = %record.reason,
        "a2a message rejected"
    );
}

/// Combines identity resolution, signing, verification, and policy
/// enforcement behind one composition root, explicit dependency passing
/// rather than a global singleton.
pub struct IdentityService {
    identity_cache: IdentityCache,
    identity_provider: Box<dyn IdentityProvider>,
    environment: crate::config::Environment,
    signing_key: Vec<u8>,
    signing_mode: SigningMode,
    trusted_service_accounts: Vec<String>,
    clock_skew_tolerance_seconds: i64,
}

impl IdentityService {
    /// Build the service from a validated [`Config`], using the default
    /// environment-variable identity provider.
    pub fn from_config(config: &Config) -> Self {
        let signing_mode = if config.use_pbkdf2 {
            SigningMode::Pbkdf2Hmac {
                iterations: config.pbkdf2_iterations,
            }
        } else {
            SigningMode::Hmac
        };
        Self {
            identity_cache: IdentityCache::new(),
            identity_provider: Box::new(EnvIdentityProvider),
            environment: config.environment,
            signing_key: config.signing_key.clone().into_bytes(),
            signing_mode,
            trusted_service_accounts: config.trusted_service_accounts.clone(),
            clock_skew_tolerance_seconds: config.clock_skew_tolerance_seconds,
        }
    }

    /// Resolve (and cache) the current process identity.
    pub async fn current_identity(&self) -> NavigatorResult<&ServiceIdentity> {
        self.identity_cache
            .get_or_resolve(self.identity_provider.as_ref(), self.environment)
            .await
    }

    /// Sign `message`'s canonical bytes under the configured mode.
    pub fn sign(&self, message: &A2AMessage) -> String {
        crypto::sign(&self.signing_key, &message.canonical_bytes(), self.signing_mode)
    }

    /// Verify `message`'s signature against the configured key and mode.
    pub fn verify(&self, message: &A2AMessage) -> bool {
        let mode = SigningMode::from_algorithm_name(
            &message.security.algorithm,
            match self.signing_mode {
                SigningMode::Pbkdf2Hmac { iterations } => iterations,
                SigningMode::Hmac => 0,
            },
        );
        match mode {
            Some(mode) => crypto::verify(
                &self.signing_key,
                &message.canonical_bytes(),
                &message.security.signature,
                mode,
            ),
            None => false,
        }
    }

    /// Whether `service_account_id` is on the trusted list, or a synthetic
    /// development identity while running without a configured trust list.
    fn is_trusted(&self, service_account_id: &str) -> bool {
        if self.trusted_service_accounts.is_empty()
            && self.environment == crate::config::Environment::Development
        {
            service_account_id == identity::synthetic_dev_identity().email
        } else {
            self.trusted_service_accounts
                .iter()
                .any(|trusted| trusted == service_account_id)
        }
    }

    /// The three publish-time checks (identity trusted, signature valid,
    /// sender authorised). Unlike [`IdentityService::validate`], this does
    /// not check expiry — TTL is enforced at receive time, not publish time.
    pub fn check_publish(&self, message: &A2AMessage) -> NavigatorResult<()> {
        if !self.is_trusted(&message.security.service_account_id) {
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "unauthorised".to_string(),
            });
            return Err(crate::error::NavigatorError::Unauthorised {
                message: format!("{} is not a trusted identity", message.security.service_account_id),
            });
        }
        if !policy::is_authorized(&message.from_agent, &message.to_agent) {
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "unauthorised".to_string(),
            });
            return Err(crate::error::NavigatorError::Unauthorised {
                message: format!(
                    "{} is not authorised to send to {}",
                    message.from_agent, message.to_agent
                ),
            });
        }
        if !self.verify(message) {
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "malformed".to_string(),
            });
            return Err(crate::error::NavigatorError::Malformed {
                message: "signature does not match canonical form".to_string(),
            });
        }
        Ok(())
    }

    /// The four-check validation: identity trusted,
    /// signature matches, sender authorised for `to_agent`, not expired.
    /// Emits exactly one sanitised audit record per failing check.
    pub fn validate(&self, message: &A2AMessage, now: f64) -> ValidationReport {
        let mut issues = Vec::new();

        if !self.is_trusted(&message.security.service_account_id) {
            issues.push("identity not trusted".to_string());
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "unauthorised".to_string(),
            });
        }

        if !self.verify(message) {
            issues.push("signature does not match canonical form".to_string());
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "malformed".to_string(),
            });
        }

        if !policy::is_authorized(&message.from_agent, &message.to_agent) {
            issues.push(format!(
                "{} is not authorised to send to {}",
                message.from_agent, message.to_agent
            ));
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "unauthorised".to_string(),
            });
        }

        if message.is_expired(now, self.clock_skew_tolerance_seconds) {
            issues.push("message expired".to_string());
            emit_audit(&AuditRecord {
                message_id: message.message_id.clone(),
                from_agent: message.from_agent.clone(),
                to_agent: message.to_agent.clone(),
                reason: "expired".to_string(),
            });
        }

        let failed = issues.len() as u8;
        ValidationReport {
            is_valid: failed == 0,
            issues,
            security_score: 100 - 25 * failed.min(4),
        }
    }

    /// Signing mode this service uses for outbound messages.
    pub fn signing_mode(&self) -> SigningMode {
        self.signing_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message::{MessagePayload, Priority, TraceContext};
    use crate::config::Config;
    use std::collections::HashMap;

    fn service(trusted: Vec<String>) -> IdentityService {
        let mut config = Config::default();
        config.signing_key = "test-signing-key".to_string();
        config.trusted_service_accounts = trusted;
        IdentityService::from_config(&config)
    }

    fn sign_and_build(service: &IdentityService, from: &str, to: &str, now: f64) -> A2AMessage {
        let mut msg = A2AMessage::new(
            from,
            to,
            Priority::Medium,
            60,
            TraceContext::new_root(),
            MessagePayload::TaskDelegation {
                task: "summarise".into(),
                parameters: HashMap::new(),
            },
            now,
        );
        msg.security.algorithm = service.signing_mode().algorithm_name().to_string();
        msg.security.signature = service.sign(&msg);
        msg
    }

    #[test]
    fn fully_valid_message_scores_100() {
        let svc = service(vec!["orchestrator".to_string()]);
        let msg = sign_and_build(&svc, "orchestrator", "summariser", 1000.0);
        let mut signed = msg.clone();
        signed.security.service_account_id = "orchestrator".to_string();
        signed.security.signature = svc.sign(&signed);
        let report = svc.validate(&signed, 1000.0);
        assert!(report.is_valid);
        assert_eq!(report.security_score, 100);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn untrusted_identity_fails_validation() {
        let svc = service(vec!["orchestrator".to_string()]);
        let mut msg = sign_and_build(&svc, "orchestrator", "summariser", 1000.0);
        msg.security.service_account_id = "intruder@example.com".to_string();
        let report = svc.validate(&msg, 1000.0);
        assert!(!report.is_valid);
        assert!(report.security_score < 100);
    }

    #[test]
    fn tampered_signature_fails_validation() {
        let svc = service(vec!["orchestrator".to_string()]);
        let mut msg = sign_and_build(&svc, "orchestrator", "summariser", 1000.0);
        msg.security.service_account_id = "orchestrator".to_string();
        msg.payload = MessagePayload::AgentStatus {
            status: "tampered".to_string(),
            detail: None,
        };
        let report = svc.validate(&msg, 1000.0);
        assert!(!report.is_valid);
        assert!(report
            .issues
            .iter()
            .any(|i| i.contains("signature")));
    }

    #[test]
    fn unauthorised_route_fails_validation() {
        let svc = service(vec!["summariser".to_string()]);
        let mut msg = sign_and_build(&svc, "summariser", "linker", 1000.0);
        msg.security.service_account_id = "summariser".to_string();
        msg.security.signature = svc.sign(&msg);
        let report = svc.validate(&msg, 1000.0);
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|i| i.contains("not authorised")));
    }

    #[test]
    fn expired_message_fails_validation() {
        let svc = service(vec!["orchestrator".to_string()]);
        let mut msg = sign_and_build(&svc, "orchestrator", "summariser", 1000.0);
        msg.security.service_account_id = "orchestrator".to_string();
        msg.security.signature = svc.sign(&msg);
        let report = svc.validate(&msg, 100_000.0);
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|i| i.contains("expired")));
    }
}
