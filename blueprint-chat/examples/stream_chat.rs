//! Stream one prompt from the provider configured in the environment.
//!
//! ```sh
//! BLUEPRINT_PROVIDER=anthropic BLUEPRINT_MODEL=claude-3-5-sonnet-latest \
//! BLUEPRINT_API_KEY=sk-ant-... \
//!   cargo run -p blueprint-chat --example stream_chat -- "Print hello on BeginPlay"
//! ```
//!
//! Ctrl-C cancels the turn.

use std::io::Write;

use blueprint_chat::{ChatClient, ChatSession, ProviderSettings, TurnObserver, TurnStatus};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Prints only the new part of each transcript update.
#[derive(Default)]
struct Printer {
    printed: usize,
}

impl TurnObserver for Printer {
    fn on_transcript(&mut self, text: &str) {
        print!("{}", &text[self.printed..]);
        let _ = std::io::stdout().flush();
        self.printed = text.len();
    }

    fn on_blueprint(&mut self, blueprint: &str) {
        tracing::info!(lines = blueprint.lines().count(), "blueprint candidate");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let settings = ProviderSettings::from_env()?;
    let mut session = ChatSession::new(ChatClient::new(), settings);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let outcome = session
        .send(&prompt, "", &mut Printer::default(), &cancel)
        .await?;
    println!();

    if outcome.status == TurnStatus::Cancelled {
        eprintln!("(cancelled)");
    }
    match outcome.blueprint {
        Some(blueprint) => println!("\n--- blueprint ---\n{blueprint}"),
        None => eprintln!("no blueprint in reply"),
    }
    Ok(())
}
