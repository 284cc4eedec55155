//! Two-step login and registration flows
//!
//! Both flows start at the input step: the form is validated and a one-time
//! code is requested. Entering the code moves the user into the session.

use chrono::Utc;

use super::authenticator::{Authenticator, ChallengeId, Identity, SessionToken};
use super::session::Session;
use crate::error::{PortalError, PortalResult};
use crate::models::{User, UserProfile, PROFILE_KEY};
use crate::store::RecordStore;

/// Display name given to users who log in without registering
pub const DEFAULT_DISPLAY_NAME: &str = "Demo User";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    /// Waiting for identity and password
    Input,
    /// A code was sent; waiting for the user to type it
    Verify {
        identity: Identity,
        challenge: ChallengeId,
    },
}

fn user_from_token(token: &SessionToken, display_name: String) -> User {
    let (email, phone_number) = match &token.identity {
        Identity::Email(e) => (Some(e.clone()), None),
        Identity::Phone(p) => (None, Some(p.clone())),
    };
    User {
        uid: token.uid.clone(),
        email,
        phone_number,
        display_name,
    }
}

fn check_code(code: &str) -> PortalResult<()> {
    if code.is_empty() {
        return Err(PortalError::validation("Please enter the OTP"));
    }
    Ok(())
}

pub struct LoginFlow<'a> {
    auth: &'a dyn Authenticator,
    step: FlowStep,
}

impl<'a> LoginFlow<'a> {
    pub fn new(auth: &'a dyn Authenticator) -> Self {
        Self {
            auth,
            step: FlowStep::Input,
        }
    }

    pub fn step(&self) -> &FlowStep {
        &self.step
    }

    /// Checks the credentials and requests a code; returns the message to show
    pub fn submit_credentials(&mut self, identity: Identity, password: &str) -> PortalResult<String> {
        if identity.is_empty() || password.is_empty() {
            return Err(PortalError::validation(format!(
                "Please enter both {} and password",
                identity.channel_label()
            )));
        }

        self.auth.authenticate(&identity, password)?;
        let challenge = self.auth.request_code(&identity)?;
        self.step = FlowStep::Verify {
            identity,
            challenge,
        };
        Ok(self.auth.code_sent_message())
    }

    /// Redeems the code and signs the user into `session`
    pub fn submit_code(
        &mut self,
        store: &RecordStore,
        session: &mut Session,
        code: &str,
    ) -> PortalResult<User> {
        let FlowStep::Verify { challenge, .. } = &self.step else {
            return Err(PortalError::validation("Please enter your credentials first"));
        };
        check_code(code)?;

        let token = self.auth.verify_code(challenge, code)?;
        let user = user_from_token(&token, DEFAULT_DISPLAY_NAME.to_string());
        session.login(store, user.clone())?;
        self.step = FlowStep::Input;
        Ok(user)
    }

    /// Back to the input step, discarding any pending challenge
    pub fn reset(&mut self) {
        self.step = FlowStep::Input;
    }
}

/// Fields collected by the sign-up form
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// Register with the phone number instead of the email address
    pub use_phone: bool,
    pub password: String,
    pub confirm_password: String,
    pub agreed_to_terms: bool,
}

impl RegistrationForm {
    pub fn identity(&self) -> Identity {
        if self.use_phone {
            Identity::Phone(self.phone_number.clone())
        } else {
            Identity::Email(self.email.clone())
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Checks the form in the order the fields appear
    pub fn validate(&self, auth: &dyn Authenticator) -> PortalResult<()> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(PortalError::validation("Please enter your first and last name"));
        }
        if self.password.is_empty() || self.confirm_password.is_empty() {
            return Err(PortalError::validation(
                "Please enter password and confirm password",
            ));
        }
        if self.password != self.confirm_password {
            return Err(PortalError::validation("Passwords do not match"));
        }

        let identity = self.identity();
        if identity.is_empty() {
            let field = if self.use_phone { "phone number" } else { "email address" };
            return Err(PortalError::validation(format!("Please enter {}", field)));
        }
        if auth.authenticate(&identity, &self.password).is_err() {
            let message = match auth.credentials_hint(&identity) {
                Some(hint) => format!("Use demo credentials: {}", hint),
                None => "Invalid credentials".to_string(),
            };
            return Err(PortalError::validation(message));
        }

        if !self.agreed_to_terms {
            return Err(PortalError::validation(
                "Please agree to the terms and conditions",
            ));
        }
        Ok(())
    }
}

pub struct RegistrationFlow<'a> {
    auth: &'a dyn Authenticator,
    step: FlowStep,
    form: Option<RegistrationForm>,
}

impl<'a> RegistrationFlow<'a> {
    pub fn new(auth: &'a dyn Authenticator) -> Self {
        Self {
            auth,
            step: FlowStep::Input,
            form: None,
        }
    }

    pub fn step(&self) -> &FlowStep {
        &self.step
    }

    /// Validates the form and requests a code; returns the message to show
    pub fn submit(&mut self, form: RegistrationForm) -> PortalResult<String> {
        form.validate(self.auth)?;

        let identity = form.identity();
        let challenge = self.auth.request_code(&identity)?;
        self.step = FlowStep::Verify {
            identity,
            challenge,
        };
        self.form = Some(form);
        Ok(self.auth.code_sent_message())
    }

    /// Redeems the code, writes the profile and signs the new user in
    pub fn submit_code(
        &mut self,
        store: &RecordStore,
        session: &mut Session,
        code: &str,
    ) -> PortalResult<User> {
        let (FlowStep::Verify { challenge, .. }, Some(form)) = (&self.step, &self.form) else {
            return Err(PortalError::validation("Please fill in the registration form first"));
        };
        check_code(code)?;

        let token = self.auth.verify_code(challenge, code)?;
        let profile = UserProfile {
            uid: token.uid.clone(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.clone(),
            phone: form.phone_number.clone(),
            created_at: Utc::now(),
        };
        store.save(PROFILE_KEY, &profile)?;

        let user = user_from_token(&token, form.display_name());
        session.login(store, user.clone())?;
        self.reset();
        Ok(user)
    }

    pub fn reset(&mut self) {
        self.step = FlowStep::Input;
        self.form = None;
    }
}
