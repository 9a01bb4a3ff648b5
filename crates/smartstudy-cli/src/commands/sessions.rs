//! Sessions command implementation.

use crate::cli::{SessionAction, SessionsArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use smartstudy_domain::{SessionStore, StudySession};
use smartstudy_store::SqliteSessionStore;

/// Execute the sessions command.
pub async fn execute_sessions(args: SessionsArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let database = config.database_path()?;
    if let Some(parent) = database.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut store = SqliteSessionStore::new(&database)?;

    match args.action {
        SessionAction::List => {
            let sessions = store.list_sessions()?;
            println!("{}", formatter.format_sessions(&sessions)?);
        }
        SessionAction::Show { id } => {
            let session = open_session(&mut store, id.as_deref())?;
            println!("{}", formatter.format_session(&session)?);
        }
        SessionAction::Delete { id } => {
            if store.load_session(&id)?.is_none() {
                return Err(CliError::SessionNotFound(id));
            }
            store.delete_session(&id)?;
            println!("{}", formatter.success(&format!("Deleted session {}", id)));
        }
    }

    Ok(())
}

/// Load a session by id, or the last opened one, and mark it as opened
fn open_session<S>(store: &mut S, id: Option<&str>) -> Result<StudySession>
where
    S: SessionStore<Error = smartstudy_store::StoreError>,
{
    let id = match id {
        Some(id) => id.to_string(),
        None => store
            .last_session_id()?
            .ok_or_else(|| CliError::InvalidInput("No session has been opened yet".to_string()))?,
    };

    let session = store
        .load_session(&id)?
        .ok_or_else(|| CliError::SessionNotFound(id.clone()))?;
    store.set_last_session_id(Some(&id))?;
    Ok(session)
}
