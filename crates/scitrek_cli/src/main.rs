//! Command-line host for the SciTrek client core.
//!
//! # Responsibility
//! - Drive login, answer inspection, saving and logout against a live backend.
//! - Stand in for the lesson pages when exercising the autosave session.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use log::error;
use scitrek_core::{
    init_logging, logout, progress_percent, AnswerShape, AppConfig, AuthClient, Day1Answers,
    Day2Answers, Day3Answers, Day4Answers, Day5Answers, FileCredentialStore, HttpApiClient,
    LogSettings, ModuleId, ModuleSession, Navigator, PersistenceClient, Route, SaveNotice,
    SaveNotifier, SaveOutcome,
};
use serde_json::Value;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

const ENV_PASSWORD: &str = "SCITREK_PASSWORD";

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

struct PrintNotifier;

impl SaveNotifier for PrintNotifier {
    fn notify(&self, notice: SaveNotice) {
        println!("{}", notice.message());
    }
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        println!("redirect {}", route.path());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = AppConfig::from_env()?;
    if let Some(log_dir) = &cli.log_dir {
        init_logging(LogSettings::new(&config.log_level, log_dir)?.mirror_warnings(true))?;
    }

    let credentials = Arc::new(FileCredentialStore::open(&cli.credentials)?);
    let api = Arc::new(HttpApiClient::new(&config.client, credentials.clone())?);

    match cli.command {
        Command::Ping => {
            println!("scitrek_core ping={}", scitrek_core::ping());
            println!("scitrek_core version={}", scitrek_core::core_version());
        }
        Command::Login { username } => {
            let password = std::env::var(ENV_PASSWORD)
                .map_err(|_| format!("{ENV_PASSWORD} must hold the password"))?;
            api.login(&username, &password).await?;
            let profile = api.current_user().await?;
            println!("signed in as {}", profile.display_name());
        }
        Command::Whoami => {
            let profile = api.current_user().await?;
            println!("{}", profile.display_name());
            if let Some(classroom) = profile.classroom_name.as_deref() {
                println!("classroom {classroom}");
            }
        }
        Command::Answers { day } => {
            let module = ModuleId::new(day);
            match api.read(module).await? {
                Some(saved) => {
                    println!("{}", serde_json::to_string_pretty(&saved)?);
                    println!("progress {}%", progress_percent(&saved));
                }
                None => println!("no saved answers for day {module}"),
            }
        }
        Command::Save { day, edits } => {
            let edits = edits
                .iter()
                .map(|raw| parse_edit(raw))
                .collect::<CliResult<Vec<_>>>()?;
            let outcome = match day {
                1 => save_day::<Day1Answers>(day, api, &config, &edits).await?,
                2 => save_day::<Day2Answers>(day, api, &config, &edits).await?,
                3 => save_day::<Day3Answers>(day, api, &config, &edits).await?,
                4 => save_day::<Day4Answers>(day, api, &config, &edits).await?,
                _ => save_day::<Day5Answers>(day, api, &config, &edits).await?,
            };
            if let SaveOutcome::Failed(message) = outcome {
                return Err(message.into());
            }
        }
        Command::Logout => {
            let report = logout(None, credentials.as_ref(), &PrintNavigator).await;
            if !report.credentials_cleared {
                return Err("stored tokens could not be removed".into());
            }
        }
    }
    Ok(())
}

/// Mounts a session for `day`, applies the edits and saves explicitly.
async fn save_day<A: AnswerShape>(
    day: u32,
    api: Arc<HttpApiClient>,
    config: &AppConfig,
    edits: &[(String, Value)],
) -> CliResult<SaveOutcome> {
    let session = ModuleSession::<A>::mount(
        ModuleId::new(day),
        api,
        Arc::new(PrintNotifier),
        config.autosave,
    )
    .await;
    for (path, value) in edits {
        session.set(path, value.clone())?;
    }
    let outcome = session.save().await;
    println!("progress {}%", session.progress_percent());
    session.unmount().outcome().await;
    Ok(outcome)
}

/// Splits `path=value`; values that are not valid JSON are taken as text.
fn parse_edit(raw: &str) -> CliResult<(String, Value)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("edit `{raw}` must look like PATH=VALUE"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((path.trim().to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::parse_edit;
    use serde_json::json;

    #[test]
    fn parse_edit_accepts_json_and_plain_text() {
        assert_eq!(
            parse_edit("worksheet[0]=DNA").unwrap(),
            ("worksheet[0]".to_string(), json!("DNA"))
        );
        assert_eq!(
            parse_edit("functions[1]={\"fn\":\"repair\"}").unwrap(),
            ("functions[1]".to_string(), json!({"fn": "repair"}))
        );
        assert!(parse_edit("worksheet[0]").is_err());
    }
}
