//! A terminal chat built on `moodreel` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use moodreel::SessionBuilder;
use moodreel::core::transcript::{AgentTag, Message, Role};
use moodreel::core::{Provider, Settings, UiState};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match settings_from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("starting with {settings:?}");

    let session = SessionBuilder::with_settings(settings).build();
    let Ok(mut state_rx) = session.subscribe().await else {
        return;
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    // Number of transcript messages already on the screen.
    let mut shown = print_new_messages(&state_rx.borrow_and_update(), 0);

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => break,
            "/new" => {
                if session.new_chat().is_err() {
                    break;
                }
                let Ok(state) = session.snapshot().await else {
                    break;
                };
                println!();
                shown = print_new_messages(&state, 0);
                continue;
            }
            _ => {}
        }

        if session.set_input(line).is_err() || session.send().is_err() {
            break;
        }
        // Wait until the send is handled, so the first state observed below
        // already has the reply pending.
        if session.snapshot().await.is_err() {
            break;
        }

        let mut progress_bar: Option<ProgressBar> = None;
        let state = loop {
            let state = state_rx.borrow_and_update().clone();

            // The user message is already on the screen as typed.
            let unseen = &state.messages[shown.min(state.messages.len())..];
            if unseen.iter().any(|msg| msg.role() != Role::User) {
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
            }
            shown = print_new_messages(&state, shown);

            if !state.busy {
                break Some(state);
            }

            // Create a new progress bar if it has been finished.
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🎧 Listening...");
                    progress_bar
                })
                .inc(1);

            select! {
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break None;
                    }
                }
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        if let Some(progress_bar) = progress_bar {
            progress_bar.finish_and_clear();
        }
        let Some(state) = state else {
            break;
        };
        if let Some(err) = &state.last_error {
            println!("{}⚠️  {}", BAR_CHAR.bright_red(), err.bright_red());
        }
    }
}

/// Prints the messages after the first `shown` ones, returns the new count.
fn print_new_messages(state: &UiState, shown: usize) -> usize {
    for msg in state.messages.iter().skip(shown) {
        print_message(msg);
    }
    state.messages.len()
}

fn print_message(msg: &Message) {
    if msg.role() == Role::User {
        return;
    }
    match msg.agent_tag() {
        Some(AgentTag::Movie) => {
            println!("{}🎬 {}", BAR_CHAR.bright_magenta(), msg.content().bright_white());
        }
        Some(AgentTag::Music) | None => {
            println!("{}🎧 {}", BAR_CHAR.bright_cyan(), msg.content().bright_white());
        }
    }
}

fn settings_from_env() -> Result<Settings, String> {
    settings_from_vars(|name| env::var(name).ok())
}

fn settings_from_vars(
    var: impl Fn(&str) -> Option<String>,
) -> Result<Settings, String> {
    let Some(api_key) = var("OPENAI_API_KEY") else {
        return Err("OPENAI_API_KEY environment variable is not set".to_owned());
    };

    let provider = match var("MOODREEL_PROVIDER") {
        Some(provider) => match provider.trim().to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "openrouter" => Provider::OpenRouter,
            "custom" => Provider::Custom,
            other => return Err(format!("unknown provider: {other}")),
        },
        None => Provider::default(),
    };

    let mut settings = Settings {
        provider,
        // Blank means the provider's default.
        base_url: var("OPENAI_BASE_URL").unwrap_or_default(),
        api_key,
        ..Default::default()
    };
    if provider == Provider::Custom && settings.effective_base_url().is_none() {
        return Err("OPENAI_BASE_URL is required for a custom provider".to_owned());
    }
    if let Some(model) = var("OPENAI_MODEL") {
        settings.model = model;
    }
    if let Some(prompt) = var("MOODREEL_SYSTEM_PROMPT") {
        settings.system_prompt_override = prompt;
    }
    if let Some(strict) = var("MOODREEL_STRICT_OUTPUT") {
        settings.strict_output_mode = matches!(strict.trim(), "1" | "true" | "yes");
    }

    Ok(settings)
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
