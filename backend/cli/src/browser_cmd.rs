//! Browser Commands
//!
//! Each command opens its own connection and session, runs, and closes.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use marionette_browser::client::NEW_SESSION;
use marionette_browser::element_query::FIND_ELEMENT;
use marionette_browser::page_control::{EXECUTE_SCRIPT, NAVIGATE};
use marionette_browser::{
    element_reference, ClientOptions, ClientResult, CommandObserver, MarionetteClient,
    ProtocolError, Strategy,
};
use marionette_logging::{WireEvent, WireEventLogger};

use crate::terminal_output::{note_info, note_success, render_table};

const MAX_CELL_WIDTH: usize = 80;

/// Logs every command the client writes and every reply it reads as wire events.
struct WireEventRecorder {
    endpoint: String,
}

impl CommandObserver for WireEventRecorder {
    fn command_sent(&mut self, id: u64, name: &str, params: &Value) {
        WireEventLogger::log_event(&self.endpoint, WireEvent::command_sent(id, name, params));
    }

    fn response_received(&mut self, id: u64, payload: &Map<String, Value>) {
        WireEventLogger::log_event(&self.endpoint, response_event(id, payload));
    }

    fn remote_error(&mut self, id: u64, error: &ProtocolError) {
        WireEventLogger::log_event(&self.endpoint, remote_error_event(id, error));
    }
}

fn response_event(id: u64, payload: &Map<String, Value>) -> WireEvent {
    WireEvent::response_received(id, &Value::Object(payload.clone()))
}

fn remote_error_event(id: u64, error: &ProtocolError) -> WireEvent {
    WireEvent::RemoteError {
        id,
        kind: error.kind().to_string(),
        message: error.detail().map(str::to_string),
    }
}

/// An open client with a session. Wire events come from the client itself.
struct Session {
    client: MarionetteClient,
}

impl Session {
    fn start(options: ClientOptions) -> Result<Self> {
        let endpoint = options.addr();
        let mut client = MarionetteClient::open(options)
            .with_context(|| format!("Could not open Marionette connection to {endpoint}"))?;
        client.set_observer(WireEventRecorder { endpoint });
        let mut session = Self { client };
        session.run(NEW_SESSION, |c| c.new_session())?;
        Ok(session)
    }

    fn run<T>(
        &mut self,
        name: &str,
        op: impl FnOnce(&mut MarionetteClient) -> ClientResult<T>,
    ) -> Result<T> {
        debug!(id = self.client.next_correlation_id(), command = name, "Running command");
        op(&mut self.client).map_err(|err| {
            if let Some(remote) = err.as_remote() {
                debug!(kind = remote.kind(), trace = ?remote.trace(), "Remote stack");
            }
            anyhow!(err).context(format!("{name} failed"))
        })
    }

    fn navigate_if(&mut self, url: Option<&str>) -> Result<()> {
        if let Some(url) = url {
            self.run(NAVIGATE, |c| c.navigate(url))?;
        }
        Ok(())
    }

    fn finish(mut self) {
        self.client.close();
    }
}

pub fn handshake(options: ClientOptions) -> Result<()> {
    let endpoint = options.addr();
    let mut client = MarionetteClient::open(options)
        .with_context(|| format!("Could not open Marionette connection to {endpoint}"))?;
    let Some(info) = client.handshake() else {
        bail!("connected to {endpoint} but no handshake was recorded");
    };
    note_success(&format!("Connected to {endpoint}"));
    note_info(&format!("Protocol version: {}", info.protocol_version));
    note_info(&format!(
        "Application type: {}",
        info.application_type.as_deref().unwrap_or("unknown")
    ));
    client.close();
    Ok(())
}

pub fn navigate(options: ClientOptions, url: &str) -> Result<()> {
    let mut session = Session::start(options)?;
    session.navigate_if(Some(url))?;
    session.finish();
    note_success(&format!("Navigated to {url}"));
    Ok(())
}

pub fn exec(options: ClientOptions, script: &str, raw_args: &[String], url: Option<&str>) -> Result<()> {
    let args = parse_script_args(raw_args)?;
    let mut session = Session::start(options)?;
    session.navigate_if(url)?;
    let payload = session.run(EXECUTE_SCRIPT, |c| c.execute_script(script, &args))?;
    session.finish();

    let result = payload.get("value").cloned().unwrap_or(Value::Object(payload));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn find(options: ClientOptions, using: Strategy, value: &str, url: Option<&str>) -> Result<()> {
    let mut session = Session::start(options)?;
    session.navigate_if(url)?;
    let payload = session.run(FIND_ELEMENT, |c| c.find_element_by(using, value))?;
    session.finish();

    match element_reference(&payload) {
        Some(reference) => println!("{reference}"),
        None => println!("{}", serde_json::to_string_pretty(&payload)?),
    }
    Ok(())
}

pub fn storage_get(options: ClientOptions, url: Option<&str>) -> Result<()> {
    let mut session = Session::start(options)?;
    session.navigate_if(url)?;
    let entries = session.run(EXECUTE_SCRIPT, |c| c.local_storage().get())?;
    session.finish();

    if entries.is_empty() {
        note_info("Local storage is empty");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = entries.into_iter().map(|(k, v)| vec![k, v]).collect();
    print!("{}", render_table(&["Key", "Value"], &rows, MAX_CELL_WIDTH));
    Ok(())
}

pub fn storage_set(options: ClientOptions, raw_entries: &[String], url: Option<&str>) -> Result<()> {
    let entries = parse_entries(raw_entries)?;
    let count = entries.len();
    let mut session = Session::start(options)?;
    session.navigate_if(url)?;
    session.run(EXECUTE_SCRIPT, |c| c.local_storage().set(entries))?;
    session.finish();
    note_success(&format!("Stored {count} local storage entr{}", if count == 1 { "y" } else { "ies" }));
    Ok(())
}

pub fn storage_clear(options: ClientOptions, url: Option<&str>) -> Result<()> {
    let mut session = Session::start(options)?;
    session.navigate_if(url)?;
    session.run(EXECUTE_SCRIPT, |c| c.local_storage().clear())?;
    session.finish();
    note_success("Cleared local storage");
    Ok(())
}

/// Each `--arg` is JSON; bare words that are not valid JSON are taken as strings.
fn parse_script_args(raw: &[String]) -> Result<Vec<Value>> {
    raw.iter()
        .map(|arg| match serde_json::from_str::<Value>(arg) {
            Ok(value) => Ok(value),
            Err(_) if !looks_like_json(arg) => Ok(Value::String(arg.clone())),
            Err(e) => Err(anyhow!(e).context(format!("--arg is not valid JSON: {arg}"))),
        })
        .collect()
}

fn looks_like_json(arg: &str) -> bool {
    matches!(arg.trim_start().chars().next(), Some('{' | '[' | '"'))
}

/// `KEY=VALUE` pairs; the value may itself contain `=`. Values are stored as strings.
fn parse_entries(raw: &[String]) -> Result<Vec<(String, Value)>> {
    raw.iter()
        .map(|entry| {
            let (key, value) = entry
                .split_once('=')
                .with_context(|| format!("expected KEY=VALUE, got {entry:?}"))?;
            if key.is_empty() {
                bail!("empty key in {entry:?}");
            }
            Ok((key.to_string(), Value::String(value.to_string())))
        })
        .collect()
}
