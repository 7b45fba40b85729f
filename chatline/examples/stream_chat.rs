//! Streamed chat example.
//!
//! Sends one message to a chat backend and prints the reply as it arrives,
//! with a typing effect and a tool notice while the assistant works.
//!
//! Run with:
//! ```bash
//! CHATLINE_BASE_URL=http://localhost:8000 cargo run --example stream_chat -- "Hi there"
//! ```

use chatline::prelude::*;
use chatline::UiUpdate;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatline=info")),
        )
        .init();

    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What courses do you recommend?".to_string());

    let mut config = ClientConfig::from_env()?;
    config.reveal = RevealPacing::typing();
    let mut conversation = Conversation::new(ChatClient::new(config)?);

    // Ctrl-C cancels the reply in flight.
    let canceller = conversation.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let (observer, mut updates) = ChannelObserver::channel();
    let printer = tokio::spawn(async move {
        let mut shown = 0;
        while let Some(event) = updates.recv().await {
            match UiUpdate::from_event(&event) {
                Some(UiUpdate::Text { content }) => {
                    print!("{}", &content[shown..]);
                    shown = content.len();
                    io::stdout().flush()?;
                }
                Some(UiUpdate::Tool {
                    activity: Some(activity),
                }) => println!("\n[{activity}]"),
                Some(UiUpdate::Failed { notice }) => println!("\n{notice}"),
                _ => {}
            }
        }
        io::Result::Ok(())
    });

    println!("> {message}\n");
    let result = conversation.send(message, observer).await;
    printer.await??;

    match result {
        Ok(reply) => {
            println!();
            for product in &reply.side_payloads.products {
                println!("  * {}", product.name);
            }
            for quick_reply in &reply.side_payloads.quick_replies {
                println!("  [{}]", quick_reply.label());
            }
        }
        Err(ChatError::Cancelled) => println!("\n(cancelled)"),
        Err(err) => tracing::debug!(error = %err, "reply failed"),
    }

    Ok(())
}
