//! clients/console/src/views/chat.rs
//!
//! Chat view. One question is in flight at a time; both the answer and an
//! error are terminal states for that request, after which the prompt returns.

use dialoguer::Input;

use super::report_error;
use crate::api::ApiClient;
use crate::session::SessionStore;

pub fn run(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    println!("Ask a question (blank to go back).");
    loop {
        let question: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;
        if question.trim().is_empty() {
            return Ok(());
        }

        // The prompt blocks until the request resolves, so a second
        // submission cannot overlap the first.
        match api.chat(&question) {
            Ok(resp) => println!("\n{}\n", resp.answer),
            Err(err) => report_error(&err, store),
        }
    }
}
