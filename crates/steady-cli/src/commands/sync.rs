//! Sync subcommand: event delivery to the session gateway.
//!
//! Patches go out opportunistically after every flow transition; these
//! commands inspect the outstanding buffer and retry delivery on demand.

use clap::Subcommand;
use steady_core::storage::{Config, DraftStore};
use steady_core::sync::get_or_create_client_id;
use steady_core::{HttpGateway, SessionRunner};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show how many events are waiting for delivery
    Status,
    /// Try to deliver buffered events now
    Flush,
}

fn attach() -> Result<SessionRunner<HttpGateway>, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let gateway = HttpGateway::new(
        &config.gateway.base_url,
        config.gateway.token.clone(),
        config.gateway.request_timeout_secs,
    )?;
    Ok(SessionRunner::attach(
        &config,
        gateway,
        DraftStore::open()?,
        get_or_create_client_id()?,
    ))
}

pub fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SyncAction::Status => {
            let runner = attach()?;
            let status = serde_json::json!({
                "session_id": runner.engine().session_id(),
                "pending_events": runner.engine().log().len(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        SyncAction::Flush => {
            let mut runner = attach()?;
            let remaining = runner.flush();
            if remaining == 0 {
                println!("all events delivered");
            } else {
                match runner.last_sync_error() {
                    Some(e) => eprintln!("{remaining} events still pending: {e}"),
                    None => println!("{remaining} events still pending"),
                }
            }
        }
    }
    Ok(())
}
