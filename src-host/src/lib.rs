//! Headless host for the TalentBridge core.
//!
//! Reads one `{command, payload}` request per line from stdin and writes one
//! response per line to stdout. Pushed events are written to stdout as
//! `{event, payload}` lines as they happen; logs go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use talentbridge_core::Runtime;
use tracing_subscriber::EnvFilter;

pub mod config;

use config::HostConfig;

pub fn run() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = HostConfig::from_env()?;
    tracing::info!(data_dir = %config.data_dir.display(), "starting talentbridge host");

    let runtime = Runtime::with_config(config.runtime_config())
        .context("failed to initialize runtime")?;
    let stdout = Arc::new(Mutex::new(io::stdout()));
    attach_event_writer(&runtime, Arc::clone(&stdout));

    let stdin = io::stdin();
    serve(&runtime, stdin.lock(), &*stdout)?;

    runtime.clear_event_callback();
    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Writes every pushed event to `output` as one JSON line.
pub fn attach_event_writer<W>(runtime: &Runtime, output: Arc<Mutex<W>>)
where
    W: Write + Send + 'static,
{
    runtime.set_event_callback(move |event, message| {
        let mut output = output.lock().expect("output mutex poisoned");
        if let Err(error) = writeln!(output, "{message}").and_then(|_| output.flush()) {
            tracing::warn!(event, %error, "failed to write event");
        }
    });
}

/// Answers each non-blank request line until the input ends.
pub fn serve<R, W>(runtime: &Runtime, input: R, output: &Mutex<W>) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.context("failed to read request")?;
        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        let response = runtime.invoke_json(request);
        let mut output = output.lock().expect("output mutex poisoned");
        writeln!(output, "{response}").context("failed to write response")?;
        output.flush().context("failed to flush response")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::Value;

    use super::*;

    fn lines(output: &Mutex<Vec<u8>>) -> Vec<Value> {
        let bytes = output.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_one_response_per_request_line() {
        let runtime = Runtime::new("").unwrap();
        let input = Cursor::new(
            "{\"command\":\"jobs.getById\",\"payload\":{\"id\":\"1\"}}\n\n{broken\n",
        );
        let output = Mutex::new(Vec::new());

        serve(&runtime, input, &output).unwrap();

        let responses = lines(&output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["ok"], true);
        assert_eq!(responses[0]["data"]["id"], "1");
        assert_eq!(responses[1]["error"]["code"], "invalid_request");
    }

    #[test]
    fn test_events_are_interleaved_with_responses() {
        let runtime = Runtime::new("").unwrap();
        let output = Arc::new(Mutex::new(Vec::new()));
        attach_event_writer(&runtime, Arc::clone(&output));

        let input = Cursor::new(concat!(
            "{\"command\":\"waitingRoom.join\",\"payload\":{\"callId\":\"c1\",\"candidateName\":\"Amara\"}}\n",
            "{\"command\":\"waitingRoom.leave\",\"payload\":{\"callId\":\"c1\",\"candidateName\":\"Amara\"}}\n",
        ));
        serve(&runtime, input, &*output).unwrap();
        runtime.clear_event_callback();

        let written = lines(&output);
        let events: Vec<_> = written
            .iter()
            .filter_map(|line| line["event"].as_str())
            .collect();
        assert!(events.contains(&"waiting-room://changed"));
        assert_eq!(written.iter().filter(|line| line.get("ok").is_some()).count(), 2);
    }
}
