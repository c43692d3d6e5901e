use std::io::{self, BufRead, Write};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::warn;
use rst_common::with_tokio::tokio;

use authgate_core::authorization::types::{CredentialGate, Purpose};

/// `ConsoleGate` asks the operator to confirm on the terminal
pub struct ConsoleGate;

#[async_trait]
impl CredentialGate for ConsoleGate {
    async fn authenticate(&self, purpose: Purpose) -> bool {
        let prompt = match purpose {
            Purpose::ConfirmAuthorization => "Confirm this authorization? [y/N] ",
        };

        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            stdout.write_all(prompt.as_bytes())?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_accepted(&line),
            Ok(Err(err)) => {
                warn!("[gate:console] unable to read answer: {}", err);
                false
            }
            Err(err) => {
                warn!("[gate:console] prompt task failed: {}", err);
                false
            }
        }
    }
}

fn is_accepted(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
