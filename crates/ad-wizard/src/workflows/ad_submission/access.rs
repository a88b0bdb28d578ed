use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{ProfileLookup, Session, VerificationStatus};

/// Reasons the gate reports, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessReason {
    NotLoggedIn,
    NotVerified,
    NotPremium,
    ProfileNotFound,
    Loading,
}

impl AccessReason {
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::NotVerified => "NOT_VERIFIED",
            Self::NotPremium => "NOT_PREMIUM",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::Loading => "LOADING",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::NotLoggedIn => "You need to be logged in to create an ad",
            Self::NotVerified => "Your profile must be verified before you can create ads",
            Self::NotPremium => "A premium membership is required to create ads",
            Self::ProfileNotFound => "We could not find your profile",
            Self::Loading => "Checking your account status",
        }
    }
}

/// Outcome of the gate. `reasons` is an ordered set; messages are parallel to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub can_access: bool,
    pub reasons: Vec<AccessReason>,
    /// Set when the admin capability bypassed the profile checks.
    pub admin_override: bool,
}

impl AccessDecision {
    fn denied(reason: AccessReason) -> Self {
        Self {
            can_access: false,
            reasons: vec![reason],
            admin_override: false,
        }
    }

    fn admin() -> Self {
        Self {
            can_access: true,
            reasons: Vec::new(),
            admin_override: true,
        }
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.reasons.iter().map(|reason| reason.code()).collect()
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.reasons.iter().map(|reason| reason.message()).collect()
    }

    pub fn has_reason(&self, reason: AccessReason) -> bool {
        self.reasons.contains(&reason)
    }

    fn push_reason(&mut self, reason: AccessReason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

/// Raised when the workflow cannot be entered. Not fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ad creation is not available: {}", .0.codes().join(", "))]
pub struct AccessDenied(pub AccessDecision);

/// Injected capability deciding whether a session carries admin rights.
pub trait AdminAuthority: Send + Sync {
    fn is_admin(&self, session: &Session) -> bool;
}

/// Grants admin when the session carries the configured role claim.
#[derive(Debug, Clone)]
pub struct RoleClaimAuthority {
    role: String,
}

impl RoleClaimAuthority {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl Default for RoleClaimAuthority {
    fn default() -> Self {
        Self::new("admin")
    }
}

impl AdminAuthority for RoleClaimAuthority {
    fn is_admin(&self, session: &Session) -> bool {
        session.roles.iter().any(|role| role == &self.role)
    }
}

/// Grants admin to configured identities (case-insensitive email match).
#[derive(Debug, Clone, Default)]
pub struct AllowlistAuthority {
    emails: Vec<String>,
}

impl AllowlistAuthority {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_ascii_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }
}

impl AdminAuthority for AllowlistAuthority {
    fn is_admin(&self, session: &Session) -> bool {
        let email = session.email.trim().to_ascii_lowercase();
        self.emails.iter().any(|allowed| allowed == &email)
    }
}

/// Decides whether the ad workflow may be entered.
pub struct AccessGate {
    authority: Box<dyn AdminAuthority>,
}

impl AccessGate {
    pub fn new(authority: Box<dyn AdminAuthority>) -> Self {
        Self { authority }
    }

    pub fn evaluate(&self, session: Option<&Session>, profile: ProfileLookup) -> AccessDecision {
        let decision = self.decide(session, profile);
        info!(
            can_access = decision.can_access,
            admin_override = decision.admin_override,
            reasons = ?decision.codes(),
            "ad access evaluated"
        );
        decision
    }

    /// Like [`evaluate`](Self::evaluate) but fails with [`AccessDenied`] when
    /// the workflow is locked.
    pub fn require(
        &self,
        session: Option<&Session>,
        profile: ProfileLookup,
    ) -> Result<AccessDecision, AccessDenied> {
        let decision = self.evaluate(session, profile);
        if decision.can_access {
            Ok(decision)
        } else {
            Err(AccessDenied(decision))
        }
    }

    fn decide(&self, session: Option<&Session>, profile: ProfileLookup) -> AccessDecision {
        let session = match session {
            Some(session) if session.is_authenticated => session,
            _ => return AccessDecision::denied(AccessReason::NotLoggedIn),
        };

        if self.authority.is_admin(session) {
            debug!(user_id = %session.id, "admin capability bypasses profile checks");
            return AccessDecision::admin();
        }

        let profile = match profile {
            ProfileLookup::Loading => return AccessDecision::denied(AccessReason::Loading),
            ProfileLookup::NotFound => {
                return AccessDecision::denied(AccessReason::ProfileNotFound)
            }
            ProfileLookup::Ready(profile) => profile,
        };

        let has_verification = profile.verification_status == VerificationStatus::Verified;
        let has_premium = profile.is_premium;

        let mut decision = AccessDecision {
            can_access: true,
            reasons: Vec::new(),
            admin_override: false,
        };
        if has_verification && has_premium {
            return decision;
        }

        if !has_verification {
            decision.push_reason(AccessReason::NotVerified);
        }
        if !has_premium {
            decision.push_reason(AccessReason::NotPremium);
        }
        // Either requirement alone unlocks the workflow; the missing one is
        // still reported.
        decision.can_access = has_verification || has_premium;
        decision
    }
}
