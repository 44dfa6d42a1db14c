//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load settings, start logging and open the migrated store.
//! - Check that the configured audit default user exists.
//! - Print one health envelope as JSON and exit non-zero on setup failure.

use log::error;
use serde_json::json;
use stencil_core::api::send_response;
use stencil_core::db::migrations::current_user_version;
use stencil_core::{
    core_version, init_logging, open_db, ping, Action, Criterion, Named, Request, Settings,
    SqliteRepository, User, ViewSet,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("stencil: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, String> {
    let settings = Settings::from_env().map_err(|err| err.to_string())?;
    init_logging(&settings.log_level, settings.log_dir.as_deref()).map_err(|err| err.to_string())?;

    let conn = open_db(&settings.database_path).map_err(|err| err.to_string())?;
    let schema_version = current_user_version(&conn).map_err(|err| err.to_string())?;

    let users = SqliteRepository::<User>::from_settings(&conn, &settings).map_err(|err| err.to_string())?;
    if let Some(default_user) = settings.audit_default_user {
        let exists = users
            .alive()
            .filter(Criterion::eq("id", default_user))
            .exists()
            .map_err(|err| err.to_string())?;
        if !exists {
            return Err(format!("AUDIT_DEFAULT_USER_ID {default_user} does not name a live user"));
        }
    }

    let views = ViewSet::<Named>::builder()
        .settings(&settings)
        .map_err(|err| err.to_string())?
        .require_auth(false)
        .build()
        .map_err(|err| err.to_string())?;
    let listing = views.dispatch(&conn, Action::List, &Request::new("/named/"), None);
    if !listing.is_success() {
        return Err(listing.data.to_string());
    }

    let envelope = send_response(json!({
        "ping": ping(),
        "version": core_version(),
        "environment": format!("{:?}", settings.environment).to_lowercase(),
        "schema_version": schema_version,
        "named_records": listing.data["count"],
        "page_size": settings.page_size,
        "audit_default_user": settings.audit_default_user,
    }));
    serde_json::to_string_pretty(&envelope).map_err(|err| err.to_string())
}
