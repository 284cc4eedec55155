use anyhow::Result;
use inquire::{Confirm, Password, PasswordDisplayMode, Text};

/// Returns `value` or asks for it
pub fn text_or_prompt(value: &Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v.clone()),
        None => Ok(Text::new(label).prompt()?),
    }
}

/// Returns `value` or asks for it without echoing
pub fn password_or_prompt(value: &Option<String>, label: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v.clone()),
        None => Ok(Password::new(label)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?),
    }
}

/// Asks for the one-time code unless it was passed on the command line
pub fn otp_or_prompt(value: &Option<String>) -> Result<String> {
    match value {
        Some(v) => Ok(v.clone()),
        None => Ok(Text::new("Enter OTP:")
            .with_help_message("Check the message shown above")
            .prompt()?),
    }
}

/// Asks whether the terms were accepted unless the flag was given
pub fn confirm_terms(agreed: bool) -> Result<bool> {
    if agreed {
        return Ok(true);
    }
    Ok(Confirm::new("I agree to the Terms and Conditions")
        .with_default(false)
        .prompt()?)
}

pub fn confirm_delete(label: &str) -> Result<bool> {
    Ok(Confirm::new(&format!("Delete {}?", label))
        .with_default(false)
        .prompt()?)
}
