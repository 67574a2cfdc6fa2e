//! Test doubles shared by the unit test modules.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::Result;
use crate::events::{EventSink, InstallEvent};
use crate::executor::{vet, CommandExecutionResult, CommandExecutor, CommandSpec};

/// Executor that replays scripted results and records every call.
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<CommandExecutionResult>>>,
    calls: Mutex<Vec<CommandSpec>>,
    elevated: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Script a command line (without elevation) to exit 0 with `stdout`.
    /// Scripting the same line again queues a later answer; the last one
    /// repeats once the queue is drained.
    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.respond(command, Some(0), stdout)
    }

    pub fn respond(self, command: &str, status: Option<i32>, stdout: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(CommandExecutionResult {
                status,
                stdout: stdout.to_string(),
                stderr: String::new(),
                elevated: false,
            });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    fn run(&self, spec: &CommandSpec) -> Result<CommandExecutionResult> {
        vet(spec)?;
        self.calls.lock().unwrap().push(spec.clone());
        let key = CommandSpec::new(spec.program(), spec.args().iter().cloned()).to_string();
        let mut result = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .unwrap_or(CommandExecutionResult {
                status: Some(1),
                ..CommandExecutionResult::default()
            });
        result.elevated = spec.is_elevated() || self.elevated;
        Ok(result)
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandExecutionResult> {
        self.run(spec)
    }

    fn execute_sync(&self, spec: &CommandSpec) -> Result<CommandExecutionResult> {
        self.run(spec)
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }
}

/// Sink that keeps every posted event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<InstallEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<InstallEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.events().iter().map(InstallEvent::code).collect()
    }
}

impl EventSink for RecordingSink {
    fn post(&self, event: InstallEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Serve one canned HTTP response on a loopback port and return a URL for it.
pub async fn serve_once(status: u16, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}/artifacts/dotnet-sdk-installer.pkg")
}

/// Send headers announcing `declared_len` bytes, then only `prefix`, then hang.
pub async fn serve_stalled(declared_len: usize, prefix: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&prefix).await;
            let _ = socket.flush().await;
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    });
    format!("http://{addr}/artifacts/dotnet-sdk.exe")
}
