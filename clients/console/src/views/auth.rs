//! clients/console/src/views/auth.rs
//!
//! Account view. Logged-out users can log in or register; a successful
//! registration deliberately leaves them logged out with a prompt to log in.

use dialoguer::{Input, Password, Select};

use super::report_error;
use crate::api::ApiClient;
use crate::session::{SessionStore, StoredSession, StoredUser};

pub fn run(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    loop {
        match store.current() {
            Some(session) => {
                println!("Logged in as {}", session.user.username);
                let choice = Select::new()
                    .with_prompt("Account")
                    .items(&["Log out", "Back"])
                    .default(0)
                    .interact()?;
                if choice != 0 {
                    return Ok(());
                }
                // Revoke server-side best effort; the local session goes away
                // regardless so the UI cannot get stuck logged in.
                if let Err(err) = api.logout(&session.token) {
                    report_error(&err, store);
                }
                if store.current().is_some() {
                    store.clear()?;
                }
                println!("Logged out.");
            }
            None => {
                let choice = Select::new()
                    .with_prompt("Account")
                    .items(&["Log in", "Register", "Back"])
                    .default(0)
                    .interact()?;
                match choice {
                    0 => log_in(api, store)?,
                    1 => register(api)?,
                    _ => return Ok(()),
                }
            }
        }
    }
}

fn log_in(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new().with_prompt("Password").interact()?;

    match api.login(&username, &password) {
        Ok(resp) if resp.success => {
            let (Some(token), Some(id), Some(username)) =
                (resp.access_token, resp.user_id, resp.username)
            else {
                eprintln!("error: login response was missing the token");
                return Ok(());
            };
            store.set(StoredSession {
                token,
                user: StoredUser { id, username },
            })?;
        }
        Ok(resp) => println!("{}", resp.message),
        Err(err) => report_error(&err, store),
    }
    Ok(())
}

fn register(api: &ApiClient) -> anyhow::Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    match api.register(&username, &password) {
        Ok(resp) if resp.success => println!("Account created - you can now log in."),
        Ok(resp) => println!("{}", resp.message),
        Err(err) => eprintln!("error: {err}"),
    }
    Ok(())
}
