use clap::Subcommand;
use steady_core::storage::{Config, Database, DraftStore};
use steady_core::sync::get_or_create_client_id;
use steady_core::{FlowStep, HttpGateway, SessionEvent, SessionRunner};

type Runner = SessionRunner<HttpGateway>;
type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new run
    Begin {
        /// Where the run was started from
        #[arg(long, default_value = "cli")]
        entry: String,
        /// Shortened run with the quicker defaults
        #[arg(long)]
        quick: bool,
    },
    /// Print current flow state as JSON
    Status,
    /// Resume the saved run
    Resume,
    /// Discard the saved run and start over
    Discard,
    /// Rate intensity before regulation (0-10)
    Rate { value: u8 },
    /// Skip the running countdown (regulation or closure)
    Skip,
    /// Rate intensity after regulation (0-10)
    Check { value: u8 },
    /// Capture the thought being worked on
    Capture {
        text: Option<String>,
        /// Continue without capturing anything
        #[arg(long)]
        skip: bool,
    },
    /// Answer the current branch step
    Answer {
        text: Option<String>,
        /// Continue without answering
        #[arg(long)]
        skip: bool,
    },
    /// Leave the crisis screen
    ExitCrisis,
    /// Rate intensity at closure (0-10), optionally with confidence
    Close {
        value: u8,
        #[arg(long)]
        confidence: Option<u8>,
    },
    /// Save an anchor to carry forward
    Anchor { text: String },
    /// Finish from the summary screen
    Finish,
    /// Advance wall-clock countdowns
    Tick,
    /// Stop countdowns and leave the run resumable
    Suspend,
}

fn attach() -> Result<Runner, Box<dyn std::error::Error>> {
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

fn cold_start() -> Result<Runner, Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let gateway = HttpGateway::new(
        &config.gateway.base_url,
        config.gateway.token.clone(),
        config.gateway.request_timeout_secs,
    )?;
    Ok(SessionRunner::cold_start(
        &config,
        gateway,
        DraftStore::open()?,
        get_or_create_client_id()?,
    ))
}

/// Print the transition event, or the current state when the command did
/// not apply.
fn print_outcome(runner: &Runner, event: Option<SessionEvent>) -> CliResult {
    match event {
        Some(ev) => println!("{}", serde_json::to_string_pretty(&ev)?),
        None => println!("{}", serde_json::to_string_pretty(&runner.status())?),
    }
    Ok(())
}

/// Write the finished run into local history. Best effort; the run itself
/// is already over.
fn record_history(runner: &Runner) {
    if let Ok(db) = Database::open() {
        let data = runner.engine().data();
        let _ = db.record_session(
            runner.engine().session_id(),
            data.intensity_pre,
            data.intensity_mid,
            &runner.outcome(),
        );
    }
}

fn text_or_skip(text: Option<&str>, skip: bool) -> Result<Option<String>, String> {
    match (text, skip) {
        (_, true) => Ok(None),
        (Some(t), false) => Ok(Some(t.to_string())),
        (None, false) => Err("provide text or pass --skip".into()),
    }
}

pub fn run(action: SessionAction) -> CliResult {
    match action {
        SessionAction::Begin { entry, quick } => {
            let mut runner = attach()?;
            if runner.engine().step() != FlowStep::Prime {
                eprintln!("a run is already in progress (resume or discard it first)");
                std::process::exit(1);
            }
            runner.begin(&entry, quick)?;
            println!("{}", serde_json::to_string_pretty(&runner.status())?);
        }
        SessionAction::Status => {
            let runner = attach()?;
            println!("{}", serde_json::to_string_pretty(&runner.status())?);
        }
        SessionAction::Resume => {
            let mut runner = cold_start()?;
            let ev = runner.resume();
            print_outcome(&runner, ev)?;
        }
        SessionAction::Discard => {
            let mut runner = cold_start()?;
            let ev = runner.discard();
            print_outcome(&runner, ev)?;
        }
        SessionAction::Rate { value } => {
            let mut runner = attach()?;
            let ev = runner.rate_pre(value);
            print_outcome(&runner, ev)?;
        }
        SessionAction::Skip => {
            let mut runner = attach()?;
            let ev = runner.skip_regulation().or_else(|| runner.skip_closure());
            print_outcome(&runner, ev)?;
        }
        SessionAction::Check { value } => {
            let mut runner = attach()?;
            let ev = runner.rate_mid(value);
            print_outcome(&runner, ev)?;
        }
        SessionAction::Capture { text, skip } => {
            let text = text_or_skip(text.as_deref(), skip)?;
            let mut runner = attach()?;
            let ev = runner.capture(text.as_deref());
            print_outcome(&runner, ev)?;
        }
        SessionAction::Answer { text, skip } => {
            let text = text_or_skip(text.as_deref(), skip)?;
            let mut runner = attach()?;
            let ev = runner.answer_branch(text.as_deref());
            print_outcome(&runner, ev)?;
        }
        SessionAction::ExitCrisis => {
            let mut runner = attach()?;
            let ev = runner.exit_crisis();
            if ev.is_some() {
                record_history(&runner);
            }
            print_outcome(&runner, ev)?;
        }
        SessionAction::Close { value, confidence } => {
            let mut runner = attach()?;
            let ev = runner.rate_post(value, confidence);
            print_outcome(&runner, ev)?;
        }
        SessionAction::Anchor { text } => {
            let mut runner = attach()?;
            let ev = runner.choose_anchor(&text);
            print_outcome(&runner, ev)?;
        }
        SessionAction::Finish => {
            let mut runner = attach()?;
            let result = runner.finish();
            if runner.engine().step() == FlowStep::Done {
                record_history(&runner);
            }
            match result {
                Ok(ev) => print_outcome(&runner, ev)?,
                Err(e) => {
                    // The run is over locally either way.
                    eprintln!("session ended locally; backend not updated: {e}");
                    println!("{}", serde_json::to_string_pretty(&runner.status())?);
                }
            }
        }
        SessionAction::Tick => {
            let mut runner = attach()?;
            let ev = runner.tick();
            if runner.engine().step() == FlowStep::Done && ev.is_some() {
                record_history(&runner);
            }
            print_outcome(&runner, ev)?;
        }
        SessionAction::Suspend => {
            let mut runner = attach()?;
            let ev = runner.suspend();
            print_outcome(&runner, ev)?;
        }
    }
    Ok(())
}
