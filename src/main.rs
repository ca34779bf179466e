use std::io::{self, BufRead, Write};

use interviewer::config::{env_string_opt, EnvConfig, InterviewConfig};
use interviewer::controller::{InterviewController, SessionError, TurnOutcome};
use interviewer::providers::{archive_for_config, gateway_for_config};
use interviewer::{
    authenticate, parse_slash_command, Presenter, SlashCommand, TerminalPresenter, HELP_TEXT,
    PLACEHOLDER_RESPONDENT_ID,
};
use tracing_subscriber::EnvFilter;
use transcript_store::TranscriptStore;

const DEFAULT_LOG_FILTER: &str = "warn,interviewer=info";

fn main() -> io::Result<()> {
    let env = EnvConfig::from_env();
    init_tracing(env.log_filter.as_deref());

    let config = InterviewConfig::load(&env).map_err(io::Error::other)?;
    let store = TranscriptStore::open(config.store_directories()).map_err(io::Error::other)?;
    let gateway = gateway_for_config(&config, env_string_opt).map_err(io::Error::other)?;
    let archive = archive_for_config(&config, env_string_opt).map_err(io::Error::other)?;

    let mut presenter = TerminalPresenter::new(
        io::stdout(),
        config.interviewer_avatar.as_str(),
        config.respondent_avatar.as_str(),
    );
    let mut input = io::stdin().lock();

    let Some(respondent_id) = resolve_respondent(&config, &mut input, &mut presenter)? else {
        return Ok(());
    };

    let mut controller = InterviewController::new(gateway, Box::new(store), config.script.clone())
        .with_generation_params(config.generation_params())
        .with_cancel_message(config.cancel_message.clone());
    if let Some(archive) = archive {
        controller = controller.with_archive(archive);
    }

    match controller.initialize(&respondent_id, &mut presenter) {
        Ok(TurnOutcome::Continue { .. }) => {}
        Ok(TurnOutcome::Closed { .. }) | Err(SessionError::AlreadyCompleted) => return Ok(()),
        Err(error) => return Err(io::Error::other(error)),
    }

    let mut line = String::new();
    loop {
        presenter.prompt();
        line.clear();
        if input.read_line(&mut line)? == 0 {
            tracing::warn!(respondent_id = %respondent_id, "input closed before the interview ended");
            return Ok(());
        }
        let text = line.trim_end_matches(['\r', '\n']);

        if let Some(command) = parse_slash_command(text) {
            match command {
                SlashCommand::Help => presenter.notice(HELP_TEXT),
                SlashCommand::Quit => {
                    controller.quit(&mut presenter).map_err(io::Error::other)?;
                    return Ok(());
                }
                SlashCommand::Unknown(name) => {
                    presenter.warn(&format!("unknown command {name}; try /help"));
                }
            }
            continue;
        }

        if text.trim().is_empty() {
            continue;
        }

        match controller.submit_turn(text, &mut presenter) {
            Ok(TurnOutcome::Continue { .. }) => {}
            Ok(TurnOutcome::Closed { .. }) => return Ok(()),
            Err(SessionError::Gateway(error)) => {
                presenter.warn(&format!(
                    "The interviewer could not reply ({error}). Please send your answer again."
                ));
            }
            Err(error) => return Err(io::Error::other(error)),
        }
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Returns `None` when input closes before a respondent signs in.
fn resolve_respondent<R, W>(
    config: &InterviewConfig,
    input: &mut R,
    presenter: &mut TerminalPresenter<W>,
) -> io::Result<Option<String>>
where
    R: BufRead,
    W: Write,
{
    if !config.logins {
        return Ok(Some(PLACEHOLDER_RESPONDENT_ID.to_string()));
    }

    loop {
        let Some(username) = read_field(input, "Username: ")? else {
            return Ok(None);
        };
        let Some(password) = read_field(input, "Password: ")? else {
            return Ok(None);
        };

        match authenticate(&config.credentials, &username, &password) {
            Ok(respondent_id) => {
                tracing::info!(respondent_id = %respondent_id, "respondent signed in");
                return Ok(Some(respondent_id));
            }
            Err(error) => presenter.warn(&error.to_string()),
        }
    }
}

fn read_field<R: BufRead>(input: &mut R, label: &str) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;

    let mut value = String::new();
    if input.read_line(&mut value)? == 0 {
        return Ok(None);
    }
    Ok(Some(value.trim_end_matches(['\r', '\n']).to_string()))
}
