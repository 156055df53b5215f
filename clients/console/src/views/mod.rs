pub mod auth;
pub mod chat;
pub mod documents;

use crate::api::ClientError;
use crate::session::SessionStore;

/// Prints an API failure and reconciles local state: a 401 means the stored
/// session is dead, so force the logged-out transition.
pub fn report_error(err: &ClientError, store: &SessionStore) {
    eprintln!("error: {err}");
    if err.is_unauthorized() && store.current().is_some() {
        match store.clear() {
            Ok(()) => println!("Your session is no longer valid - please log in again."),
            Err(e) => eprintln!("error: failed to clear the stored session: {e}"),
        }
    }
}
