//! Authentication stub
//!
//! Login and registration run through an [`Authenticator`]; the signed-in user
//! lives in an explicit [`Session`] value rather than any global state.

mod authenticator;
mod flow;
mod session;

pub use authenticator::{
    Authenticator, ChallengeId, DemoAuthenticator, Identity, SessionToken, DEMO_EMAIL, DEMO_OTP,
    DEMO_PASSWORD, DEMO_PHONE, DEMO_UID,
};
pub use flow::{FlowStep, LoginFlow, RegistrationFlow, RegistrationForm, DEFAULT_DISPLAY_NAME};
pub use session::Session;
