use std::sync::Arc;

use citypulse_core::{Aggregator, SearchOutcome, SearchSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::output;

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Clear,
    Quit,
    City(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            ":clear" => Self::Clear,
            ":quit" | ":q" => Self::Quit,
            city => Self::City(city),
        }
    }
}

/// One search in flight at a time; a new line aborts the previous search.
pub async fn run(
    aggregator: Arc<Aggregator>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let session = Arc::new(SearchSession::new());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<JoinHandle<()>> = None;

    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Clear => {
                abort(in_flight.take());
                session.clear();
                info!("search cleared");
            }
            Input::City(city) => {
                abort(in_flight.take());
                in_flight = Some(tokio::spawn(search(
                    Arc::clone(&aggregator),
                    Arc::clone(&session),
                    city.to_owned(),
                    format,
                    pretty,
                )));
            }
        }
    }

    if let Some(handle) = in_flight {
        // Cancellation is the only way this join fails.
        let _ = handle.await;
    }
    Ok(())
}

fn abort(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

async fn search(
    aggregator: Arc<Aggregator>,
    session: Arc<SearchSession>,
    city: String,
    format: OutputFormat,
    pretty: bool,
) {
    match session.search(&aggregator, &city).await {
        Ok(SearchOutcome::Committed(snapshot)) => {
            match output::render_snapshot(&snapshot, format, pretty) {
                Ok(rendered) => println!("{}", rendered.trim_end()),
                Err(error) => eprintln!("error: {error}"),
            }
        }
        Ok(SearchOutcome::Superseded) => debug!(%city, "search superseded"),
        Err(error) => eprintln!("error: {error}"),
    }
}
