//! clients/console/src/main.rs
//!
//! Interactive terminal client for the docchat API: chat, document
//! management, and account views over an explicit session context.

mod api;
mod session;
mod views;

use std::path::PathBuf;

use clap::Parser;
use dialoguer::Select;

use api::ApiClient;
use session::SessionStore;

#[derive(Parser)]
#[command(name = "docchat", about = "Terminal client for the docchat RAG service")]
struct Args {
    /// Base URL of the API server
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Override the session file location
    #[arg(long)]
    session_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let api = ApiClient::new(&args.server)?;
    let store = SessionStore::open(args.session_file.unwrap_or_else(SessionStore::default_path));

    // Announce session transitions as they happen, wherever they originate.
    store.subscribe(Box::new(|current| match current {
        Some(session) => println!("[session] logged in as {}", session.user.username),
        None => println!("[session] logged out"),
    }));

    loop {
        let status = match store.current() {
            Some(session) => format!("logged in as {}", session.user.username),
            None => "logged out".to_string(),
        };
        println!();
        let choice = Select::new()
            .with_prompt(format!("docchat ({status})"))
            .items(&["Chat", "Documents", "Account", "Quit"])
            .default(0)
            .interact()?;
        match choice {
            0 => views::chat::run(&api, &store)?,
            1 => views::documents::run(&api, &store)?,
            2 => views::auth::run(&api, &store)?,
            _ => return Ok(()),
        }
    }
}
