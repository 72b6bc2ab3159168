use crate::config::Settings;
use console::{style, Term};
use dialoguer::{Input, Password};

/// Ask for whichever credentials the settings lack.
///
/// Does nothing when stdin is not a terminal. Returns whether anything was
/// prompted for.
pub fn prompt_missing_credentials(settings: &mut Settings) -> anyhow::Result<bool> {
    let needs_email = settings.email.trim().is_empty();
    let needs_password = settings.password.is_empty();

    if !(needs_email || needs_password) || !Term::stderr().is_term() {
        return Ok(false);
    }

    eprintln!(
        "{} SpeechLab credentials not configured (SPEECHLAB_EMAIL / SPEECHLAB_PASSWORD)",
        style("!").yellow()
    );

    if needs_email {
        settings.email = Input::new()
            .with_prompt("SpeechLab email")
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.contains('@') {
                    Ok(())
                } else {
                    Err("Enter a valid email address")
                }
            })
            .interact_text()?;
    }

    if needs_password {
        settings.password = Password::new()
            .with_prompt("SpeechLab password")
            .interact()?;
    }

    eprintln!("{} Credentials set for this run\n", style("✓").green());
    Ok(true)
}
