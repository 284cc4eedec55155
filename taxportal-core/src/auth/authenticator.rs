//! Credential and one-time-code checks
//!
//! The portal has no identity service; [`DemoAuthenticator`] accepts a single
//! hard-coded account and passcode so the login flow can be exercised end to end.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::error::AuthError;
use crate::models::new_id;

/// Demo account email
pub const DEMO_EMAIL: &str = "abc234@gmail.com";
/// Demo account phone number
pub const DEMO_PHONE: &str = "+1234567890";
/// Demo account password
pub const DEMO_PASSWORD: &str = "12345";
/// The only one-time code the demo authenticator accepts
pub const DEMO_OTP: &str = "123456";
/// uid stored for every demo login
pub const DEMO_UID: &str = "demo-user-123";

/// What the user signs in with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Email(String),
    Phone(String),
}

impl Identity {
    pub fn value(&self) -> &str {
        match self {
            Identity::Email(v) | Identity::Phone(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value().is_empty()
    }

    /// Human label for the channel, as used in form messages
    pub fn channel_label(&self) -> &'static str {
        match self {
            Identity::Email(_) => "email",
            Identity::Phone(_) => "phone number",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Handle for an outstanding one-time-code challenge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChallengeId(pub String);

/// Proof that a challenge was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub uid: String,
    pub identity: Identity,
    pub token: String,
}

/// Identity service the login and registration flows talk to
pub trait Authenticator {
    /// Checks a password for `identity`
    fn authenticate(&self, identity: &Identity, password: &str) -> Result<(), AuthError>;

    /// Sends a one-time code to `identity`
    fn request_code(&self, identity: &Identity) -> Result<ChallengeId, AuthError>;

    /// Exchanges a code for a session token; a challenge can only be redeemed once
    fn verify_code(&self, challenge: &ChallengeId, code: &str) -> Result<SessionToken, AuthError>;

    /// Text shown after a code was sent
    fn code_sent_message(&self) -> String {
        "OTP sent successfully!".to_string()
    }

    /// Which values the user should type, when the service can say
    fn credentials_hint(&self, _identity: &Identity) -> Option<String> {
        None
    }
}

/// Accepts only the demo account and the demo passcode
#[derive(Default)]
pub struct DemoAuthenticator {
    challenges: Mutex<HashMap<ChallengeId, Identity>>,
}

impl DemoAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    fn expected(identity: &Identity) -> &'static str {
        match identity {
            Identity::Email(_) => DEMO_EMAIL,
            Identity::Phone(_) => DEMO_PHONE,
        }
    }

    fn with_challenges<T>(
        &self,
        f: impl FnOnce(&mut HashMap<ChallengeId, Identity>) -> T,
    ) -> Result<T, AuthError> {
        let mut challenges = self
            .challenges
            .lock()
            .map_err(|_| AuthError::UnknownChallenge)?;
        Ok(f(&mut challenges))
    }
}

impl Authenticator for DemoAuthenticator {
    fn authenticate(&self, identity: &Identity, password: &str) -> Result<(), AuthError> {
        if identity.value() != Self::expected(identity) || password != DEMO_PASSWORD {
            return Err(AuthError::InvalidCredentials(format!(
                "Invalid credentials. Use {} and password {}",
                Self::expected(identity),
                DEMO_PASSWORD
            )));
        }
        Ok(())
    }

    fn request_code(&self, identity: &Identity) -> Result<ChallengeId, AuthError> {
        let challenge = ChallengeId(new_id());
        self.with_challenges(|c| c.insert(challenge.clone(), identity.clone()))?;
        Ok(challenge)
    }

    fn verify_code(&self, challenge: &ChallengeId, code: &str) -> Result<SessionToken, AuthError> {
        let identity = self
            .with_challenges(|c| c.get(challenge).cloned())?
            .ok_or(AuthError::UnknownChallenge)?;

        if code != DEMO_OTP {
            return Err(AuthError::InvalidCode(format!("Invalid OTP. Use {}", DEMO_OTP)));
        }

        self.with_challenges(|c| c.remove(challenge))?;
        Ok(SessionToken {
            uid: DEMO_UID.to_string(),
            identity,
            token: new_id(),
        })
    }

    fn code_sent_message(&self) -> String {
        format!("OTP sent successfully! Use {}", DEMO_OTP)
    }

    fn credentials_hint(&self, identity: &Identity) -> Option<String> {
        Some(format!("{} and password {}", Self::expected(identity), DEMO_PASSWORD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_credentials() {
        let auth = DemoAuthenticator::new();
        assert!(auth
            .authenticate(&Identity::Email(DEMO_EMAIL.into()), DEMO_PASSWORD)
            .is_ok());
        assert!(auth
            .authenticate(&Identity::Phone(DEMO_PHONE.into()), DEMO_PASSWORD)
            .is_ok());

        let err = auth
            .authenticate(&Identity::Email("x@y.z".into()), DEMO_PASSWORD)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid credentials. Use abc234@gmail.com and password 12345"
        );

        // An email value does not pass on the phone channel
        assert!(auth
            .authenticate(&Identity::Phone(DEMO_EMAIL.into()), DEMO_PASSWORD)
            .is_err());
    }

    #[test]
    fn test_challenge_is_single_use() {
        let auth = DemoAuthenticator::new();
        let identity = Identity::Email(DEMO_EMAIL.into());
        let challenge = auth.request_code(&identity).unwrap();

        let err = auth.verify_code(&challenge, "000000").unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP. Use 123456");

        // A wrong code does not burn the challenge
        let token = auth.verify_code(&challenge, DEMO_OTP).unwrap();
        assert_eq!(token.uid, DEMO_UID);
        assert_eq!(token.identity, identity);

        assert_eq!(
            auth.verify_code(&challenge, DEMO_OTP).unwrap_err(),
            AuthError::UnknownChallenge
        );
    }
}
