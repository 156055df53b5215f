//! clients/console/src/views/documents.rs
//!
//! Documents view. Gated on a live session; the listing is refetched on view
//! entry and after every mutating action.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use serde_json::Value;

use super::report_error;
use crate::api::ApiClient;
use crate::session::SessionStore;

pub fn run(api: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    let Some(session) = store.current() else {
        println!("Log in first to manage documents.");
        return Ok(());
    };
    let token = session.token;

    refresh(api, store, &token);
    loop {
        // A 401 anywhere in this view clears the session; bail out then.
        if store.current().is_none() {
            return Ok(());
        }
        let choice = Select::new()
            .with_prompt("Documents")
            .items(&[
                "Refresh",
                "Add text",
                "Upload file",
                "Show document",
                "Clear all",
                "Back",
            ])
            .default(0)
            .interact()?;
        match choice {
            0 => refresh(api, store, &token),
            1 => {
                add_text(api, store, &token)?;
                refresh(api, store, &token);
            }
            2 => {
                upload_file(api, store, &token)?;
                refresh(api, store, &token);
            }
            3 => show_document(api, store, &token)?,
            4 => {
                clear_all(api, store, &token)?;
                refresh(api, store, &token);
            }
            _ => return Ok(()),
        }
    }
}

fn refresh(api: &ApiClient, store: &SessionStore, token: &str) {
    match api.list_documents(token) {
        Ok(listing) => {
            println!("{} document(s)", listing.total_count);
            for doc in &listing.documents {
                let created = doc.created_at.as_deref().unwrap_or("-");
                println!("  {}  {}  {}", doc.id, created, doc.content);
            }
        }
        Err(err) => report_error(&err, store),
    }
}

fn add_text(api: &ApiClient, store: &SessionStore, token: &str) -> anyhow::Result<()> {
    let content: String = Input::new().with_prompt("Content").interact_text()?;
    let metadata_raw: String = Input::new()
        .with_prompt("Metadata JSON object (optional)")
        .allow_empty(true)
        .interact_text()?;

    let metadata = if metadata_raw.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(&metadata_raw) {
            Ok(value @ Value::Object(_)) => Some(value),
            Ok(_) => {
                eprintln!("error: metadata must be a JSON object");
                return Ok(());
            }
            Err(e) => {
                eprintln!("error: invalid metadata JSON: {e}");
                return Ok(());
            }
        }
    };

    match api.add_document(token, &content, metadata) {
        Ok(resp) => println!("{}", resp.message),
        Err(err) => report_error(&err, store),
    }
    Ok(())
}

fn upload_file(api: &ApiClient, store: &SessionStore, token: &str) -> anyhow::Result<()> {
    let path: String = Input::new()
        .with_prompt("Path to a .md or .pdf file")
        .interact_text()?;

    match api.upload_file(token, &PathBuf::from(path)) {
        Ok(resp) => println!("{}", resp.message),
        Err(err) => report_error(&err, store),
    }
    Ok(())
}

fn show_document(api: &ApiClient, store: &SessionStore, token: &str) -> anyhow::Result<()> {
    let id: String = Input::new().with_prompt("Document id").interact_text()?;

    match api.get_document(token, id.trim()) {
        Ok(doc) => {
            println!("id: {}", doc.id);
            if let Some(created) = &doc.created_at {
                println!("created: {created}");
            }
            if let Some(metadata) = &doc.metadata {
                println!("metadata: {metadata}");
            }
            println!("\n{}\n", doc.content);
        }
        Err(err) => report_error(&err, store),
    }
    Ok(())
}

fn clear_all(api: &ApiClient, store: &SessionStore, token: &str) -> anyhow::Result<()> {
    let confirmed = Confirm::new()
        .with_prompt("Delete ALL documents?")
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(());
    }

    match api.clear_documents(token) {
        Ok(resp) => println!("{}", resp.message),
        Err(err) => report_error(&err, store),
    }
    Ok(())
}
