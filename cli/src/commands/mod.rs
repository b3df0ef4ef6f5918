use anyhow::{Context, Result};
use petconnect_core::{
    ApiError, Credentials, ExpiryReason, NewTutor, PetConnect, SessionEvent, SignedIn,
};
use serde::Serialize;
use tokio::sync::broadcast;

mod pets;
mod tutors;

pub(crate) use pets::{run_pets as pets, PetCommand};
pub(crate) use tutors::{run_tutors as tutors, TutorCommand};

/// Turn a client error into the message a user should see.
pub(crate) fn friendly(err: ApiError) -> anyhow::Error {
    tracing::debug!(error = ?err, "request failed");
    anyhow::anyhow!(err.user_message())
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn signed_in(app: &PetConnect) -> Result<SignedIn> {
    app.resume()
        .context("not signed in; run `petconnect login` first")
}

pub(crate) async fn login(app: &PetConnect, username: String, password: String) -> Result<()> {
    let session = app
        .login(&Credentials::new(username, password))
        .await
        .map_err(friendly)?;
    match session.user() {
        Some(user) => println!("Signed in as {} <{}>.", user.name, user.email),
        None => println!("Signed in."),
    }
    Ok(())
}

pub(crate) fn whoami(app: &PetConnect) -> Result<()> {
    let session = signed_in(app)?;
    match session.user() {
        Some(user) => print_json(user),
        None => {
            println!("Signed in (no profile stored).");
            Ok(())
        }
    }
}

pub(crate) async fn register(
    app: &PetConnect,
    tutor: NewTutor,
    password: Option<String>,
) -> Result<()> {
    let registration = app
        .register_tutor(&tutor, password.as_deref())
        .await
        .map_err(friendly)?;
    print_json(&registration.tutor)?;
    if registration.signed_in.is_some() {
        println!("Signed in as {}.", registration.tutor.name);
    }
    Ok(())
}

/// Tell the user about anything the session layer did during this run.
pub(crate) fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::Expired(ExpiryReason::MissingRefreshToken)
            | SessionEvent::Expired(ExpiryReason::RefreshRejected) => {
                eprintln!("Your session has expired. Run `petconnect login` to sign in again.");
            }
            SessionEvent::Refreshed => tracing::debug!("access token refreshed"),
            SessionEvent::LoggedIn { .. } | SessionEvent::LoggedOut => {}
        }
    }
}
