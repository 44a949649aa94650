use inkfusion_core::{AuthError, TokenStore};

use crate::cli::AuthCommands;
use crate::commands::common::ClientContext;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
        } => {
            let context = ClientContext::for_profile(profile.as_deref().or(global_profile))?;
            run_login(&context, &email, &password).await
        }
        AuthCommands::Signup {
            profile,
            name,
            email,
            password,
        } => {
            let context = ClientContext::for_profile(profile.as_deref().or(global_profile))?;
            run_signup(&context, &name, &email, &password).await
        }
        AuthCommands::Status { profile } => {
            let context = ClientContext::for_profile(profile.as_deref().or(global_profile))?;
            println!("{}", auth_status(&context).await?);
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let context = ClientContext::for_profile(profile.as_deref().or(global_profile))?;
            context.auth_client()?.logout()?;
            println!("Signed out profile '{}'", context.profile_name);
            Ok(())
        }
    }
}

pub async fn run_login<S: TokenStore>(
    context: &ClientContext<S>,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    context.auth_client()?.login(email, password).await?;
    println!(
        "Signed in profile '{}' as {}",
        context.profile_name,
        email.trim()
    );
    Ok(())
}

pub async fn run_signup<S: TokenStore>(
    context: &ClientContext<S>,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    context.auth_client()?.signup(name, email, password).await?;
    println!(
        "Created account {} and signed in profile '{}'",
        email.trim(),
        context.profile_name
    );
    Ok(())
}

/// One-line description of the profile's sign-in state.
pub async fn auth_status<S: TokenStore>(context: &ClientContext<S>) -> Result<String, CliError> {
    let profile_name = &context.profile_name;
    if !context.session.is_authenticated() {
        return Ok(format!("Profile '{profile_name}' is not signed in."));
    }

    match context.auth_client()?.current_user().await {
        Ok(user) => Ok(format!(
            "Profile '{profile_name}' is signed in as {} <{}>",
            user.name, user.email
        )),
        Err(AuthError::Unauthorized) => Ok(format!(
            "Profile '{profile_name}' has a stored token the server rejected. Run `inkfusion auth login` again."
        )),
        Err(error) => Err(error.into()),
    }
}
