// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted stand-in for a host interpreter.
//!
//! Understands a tiny R-flavoured statement language: literals, variables,
//! `x <- value`, `cat()`, `print()`, `stop()`, `readline()`, `Sys.sleep()`,
//! `source()`, `browser()`, `plot()`, `q()`, calls to functions registered on
//! the [`FakeProgram`], and the `rhost:::` debugger helpers. Scripts run line
//! by line with frame tracking so breakpoints and browser stepping behave
//! like the real host.

use crate::broker::{ConnectionGuard, HostConnection};
use crate::wire::WireError;
use rh_core::{
    BlobId, CallbackReply, ClientMessage, EvalOutcome, HostCallback, HostMessage, OutputStream,
    PromptContext, PromptId, PromptInfo, ReplyBody, RequestId,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;

/// Leading bytes of every blob produced by `plot()`.
pub const PLOT_MAGIC: &[u8] = b"\x89PNG\r\n";

/// Source files and function definitions available to a [`FakeInterpreter`].
#[derive(Debug, Clone, Default)]
pub struct FakeProgram {
    files: HashMap<String, Vec<String>>,
    functions: HashMap<String, FunctionDef>,
}

#[derive(Debug, Clone)]
struct FunctionDef {
    file: String,
    start: u32,
    end: u32,
}

impl FakeProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file; lines are numbered from 1.
    pub fn with_file(mut self, name: &str, source: &str) -> Self {
        self.files
            .insert(name.to_string(), source.lines().map(str::to_string).collect());
        self
    }

    /// Register a function whose body is lines `start..=end` of `file`.
    pub fn with_function(mut self, name: &str, file: &str, start: u32, end: u32) -> Self {
        self.functions.insert(
            name.to_string(),
            FunctionDef {
                file: file.to_string(),
                start,
                end,
            },
        );
        self
    }
}

/// Non-local exits out of the statement executor.
#[derive(Debug)]
enum Unwind {
    /// An R-level condition (`stop()`, unknown object)
    Error(String),
    /// Interrupt or `Q` at the browser: unwind to top level quietly
    Interrupted,
    /// The host is exiting with a status
    Exit(i32),
    /// The client went away
    Closed,
}

type Step<'a, T> = Pin<Box<dyn Future<Output = Result<T, Unwind>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepMode {
    Run,
    Into,
    Over(usize),
    Out(usize),
}

#[derive(Debug)]
struct Frame {
    file: String,
    line: u32,
    /// `None` for the global frame of a sourced script
    call: Option<String>,
}

const SOURCING_CALLS: [&str; 2] = ["withVisible(eval(ei, envir))", "eval(ei, envir)"];

pub struct FakeInterpreter {
    program: FakeProgram,
    tx: mpsc::UnboundedSender<Result<HostMessage, WireError>>,
    rx: mpsc::UnboundedReceiver<ClientMessage>,
    next_prompt: u64,
    next_blob: u64,
    next_callback: u64,
    blobs: HashMap<BlobId, Vec<u8>>,
    vars: HashMap<String, Value>,
    frames: Vec<Frame>,
    breakpoints: HashSet<(String, u32)>,
    breakpoints_enabled: bool,
    step: StepMode,
}

impl FakeInterpreter {
    /// Spawn an interpreter task and return the client side of its channel.
    pub fn spawn(program: FakeProgram) -> HostConnection {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let interpreter = FakeInterpreter {
            program,
            tx: in_tx,
            rx: out_rx,
            next_prompt: 1,
            next_blob: 1,
            next_callback: 1,
            blobs: HashMap::new(),
            vars: HashMap::new(),
            frames: Vec::new(),
            breakpoints: HashSet::new(),
            breakpoints_enabled: false,
            step: StepMode::Run,
        };
        let task = tokio::spawn(interpreter.run());
        let mut guard = ConnectionGuard::default();
        guard.push(task.abort_handle());
        HostConnection {
            outbound: out_tx,
            inbound: in_rx,
            guard,
        }
    }

    async fn run(mut self) {
        loop {
            let input = match self.read_console(PromptContext::Normal, "> ".to_string()).await {
                Ok(input) => input,
                Err(Unwind::Interrupted) | Err(Unwind::Error(_)) => continue,
                Err(Unwind::Exit(status)) => return self.exit(status),
                Err(Unwind::Closed) => return,
            };
            match self.run_console(&input).await {
                Ok(()) => {}
                Err(Unwind::Interrupted) => self.unwind_to_top(),
                Err(Unwind::Error(message)) => {
                    self.unwind_to_top();
                    if self.stderr(format!("Error: {message}\n")).is_err() {
                        return;
                    }
                }
                Err(Unwind::Exit(status)) => return self.exit(status),
                Err(Unwind::Closed) => return,
            }
        }
    }

    fn exit(&mut self, status: i32) {
        let _ = self.send(HostMessage::Exiting { status });
    }

    fn unwind_to_top(&mut self) {
        self.frames.clear();
        self.step = StepMode::Run;
    }

    fn send(&self, msg: HostMessage) -> Result<(), Unwind> {
        self.tx.send(Ok(msg)).map_err(|_| Unwind::Closed)
    }

    fn stdout(&self, text: impl Into<String>) -> Result<(), Unwind> {
        self.send(HostMessage::Output {
            stream: OutputStream::Stdout,
            text: text.into(),
        })
    }

    fn stderr(&self, text: impl Into<String>) -> Result<(), Unwind> {
        self.send(HostMessage::Output {
            stream: OutputStream::Stderr,
            text: text.into(),
        })
    }

    /// Run console input line by line, auto-printing visible values.
    async fn run_console(&mut self, input: &str) -> Result<(), Unwind> {
        for line in input.lines() {
            let visible = is_visible(line);
            let value = self.exec_expr(line.to_string()).await?;
            if visible && !value.is_null() {
                self.stdout(format!("[1] {}\n", show(&value)))?;
            }
        }
        Ok(())
    }

    /// Announce a prompt and serve client traffic until it is answered.
    fn read_console(&mut self, context: PromptContext, text: String) -> Step<'_, String> {
        Box::pin(async move {
            let id = PromptId::new(self.next_prompt);
            self.next_prompt += 1;
            self.send(HostMessage::Prompt(PromptInfo {
                id,
                text,
                context,
                max_length: 0,
            }))?;
            loop {
                match self.rx.recv().await {
                    None => return Err(Unwind::Closed),
                    Some(ClientMessage::Respond { prompt_id, text }) if prompt_id == id => {
                        return Ok(text);
                    }
                    Some(ClientMessage::Respond { prompt_id, .. }) => {
                        tracing::warn!(%prompt_id, open = %id, "response to a prompt that is not open");
                    }
                    Some(ClientMessage::Evaluate {
                        request_id,
                        prompt_id,
                        code,
                    }) => {
                        if prompt_id != id {
                            self.send(HostMessage::EvalResult {
                                request_id,
                                outcome: EvalOutcome::Error {
                                    message: format!("prompt {prompt_id} is not open"),
                                },
                            })?;
                            continue;
                        }
                        match self.evaluate(code).await {
                            Ok(outcome) => self.send(HostMessage::EvalResult {
                                request_id,
                                outcome,
                            })?,
                            Err(Unwind::Interrupted) => {
                                self.send(HostMessage::EvalResult {
                                    request_id,
                                    outcome: EvalOutcome::Canceled,
                                })?;
                                return Err(Unwind::Interrupted);
                            }
                            Err(other) => return Err(other),
                        }
                    }
                    Some(ClientMessage::Interrupt) => return Err(Unwind::Interrupted),
                    Some(ClientMessage::Shutdown) => return Err(Unwind::Exit(0)),
                    Some(other) => self.serve_background(other)?,
                }
            }
        })
    }

    fn evaluate(&mut self, code: String) -> Step<'_, EvalOutcome> {
        Box::pin(async move {
            let mut value = Value::Null;
            for line in code.lines() {
                match self.exec_expr(line.to_string()).await {
                    Ok(v) => value = v,
                    Err(Unwind::Error(message)) => return Ok(EvalOutcome::Error { message }),
                    Err(other) => return Err(other),
                }
            }
            Ok(EvalOutcome::Ok { value })
        })
    }

    /// Messages that are valid whether or not a prompt is open.
    fn serve_background(&mut self, msg: ClientMessage) -> Result<(), Unwind> {
        match msg {
            ClientMessage::CreateBlob { request_id, data } => {
                let blob_id = self.store_blob(data);
                self.reply(request_id, ReplyBody::BlobCreated { blob_id })
            }
            ClientMessage::GetBlob {
                request_id,
                blob_id,
            } => {
                let body = match self.blobs.get(&blob_id) {
                    Some(data) => ReplyBody::BlobData { data: data.clone() },
                    None => ReplyBody::Error {
                        message: format!("no blob with id {blob_id}"),
                    },
                };
                self.reply(request_id, body)
            }
            ClientMessage::DestroyBlobs {
                request_id,
                blob_ids,
            } => {
                for id in &blob_ids {
                    self.blobs.remove(id);
                }
                self.reply(request_id, ReplyBody::BlobsDestroyed)
            }
            ClientMessage::Evaluate { request_id, .. } => self.send(HostMessage::EvalResult {
                request_id,
                outcome: EvalOutcome::Error {
                    message: "no prompt is open".to_string(),
                },
            }),
            other => {
                tracing::warn!(kind = other.name(), "unexpected message while busy");
                Ok(())
            }
        }
    }

    fn reply(&self, request_id: RequestId, body: ReplyBody) -> Result<(), Unwind> {
        self.send(HostMessage::Reply { request_id, body })
    }

    fn store_blob(&mut self, data: Vec<u8>) -> BlobId {
        let id = BlobId::new(self.next_blob);
        self.next_blob += 1;
        self.blobs.insert(id, data);
        id
    }

    /// Block on client traffic until the reply to `request_id` arrives.
    async fn await_callback(&mut self, callback: HostCallback) -> Result<CallbackReply, Unwind> {
        let request_id = RequestId::new(self.next_callback);
        self.next_callback += 1;
        self.send(HostMessage::Callback {
            request_id,
            callback,
        })?;
        loop {
            match self.rx.recv().await {
                None => return Err(Unwind::Closed),
                Some(ClientMessage::CallbackReply {
                    request_id: id,
                    reply,
                }) if id == request_id => return Ok(reply),
                Some(ClientMessage::Interrupt) => return Err(Unwind::Interrupted),
                Some(ClientMessage::Shutdown) => return Err(Unwind::Exit(0)),
                Some(other) => self.serve_background(other)?,
            }
        }
    }

    /// `Sys.sleep`: `None` waits until interrupted.
    async fn sleep(&mut self, duration: Option<Duration>) -> Result<(), Unwind> {
        let deadline = duration.map(|d| tokio::time::Instant::now() + d);
        loop {
            let msg = match deadline {
                Some(deadline) => tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => return Ok(()),
                    msg = self.rx.recv() => msg,
                },
                None => self.rx.recv().await,
            };
            match msg {
                None => return Err(Unwind::Closed),
                Some(ClientMessage::Interrupt) => return Err(Unwind::Interrupted),
                Some(ClientMessage::Shutdown) => return Err(Unwind::Exit(0)),
                Some(other) => self.serve_background(other)?,
            }
        }
    }

    fn exec_expr(&mut self, expr: String) -> Step<'_, Value> {
        Box::pin(async move {
            let expr = expr.trim();
            if expr.is_empty() || expr.starts_with('#') {
                return Ok(Value::Null);
            }
            if let Some((name, rhs)) = split_assignment(expr) {
                let value = self.exec_expr(rhs.to_string()).await?;
                self.vars.insert(name.to_string(), value);
                return Ok(Value::Null);
            }
            if let Some((name, args)) = parse_call(expr) {
                return self.call(name, args).await;
            }
            self.atom(expr)
        })
    }

    fn atom(&self, expr: &str) -> Result<Value, Unwind> {
        if let Some(value) = literal(expr) {
            return Ok(value);
        }
        self.vars
            .get(expr)
            .cloned()
            .ok_or_else(|| Unwind::Error(format!("object '{expr}' not found")))
    }

    fn string_arg(&self, args: &[String], index: usize) -> Result<String, Unwind> {
        match args.get(index) {
            Some(arg) => match self.atom(arg)? {
                Value::String(s) => Ok(s),
                other => Ok(show(&other)),
            },
            None => Ok(String::new()),
        }
    }

    fn call(&mut self, name: String, args: Vec<String>) -> Step<'_, Value> {
        Box::pin(async move {
            match name.as_str() {
                "cat" => {
                    let mut parts = Vec::new();
                    for arg in &args {
                        parts.push(show(&self.atom(arg)?));
                    }
                    self.stdout(parts.join(" "))?;
                    Ok(Value::Null)
                }
                "print" => {
                    let value = match args.first() {
                        Some(arg) => self.exec_expr(arg.clone()).await?,
                        None => Value::Null,
                    };
                    self.stdout(format!("[1] {}\n", show(&value)))?;
                    Ok(value)
                }
                "stop" => Err(Unwind::Error(self.string_arg(&args, 0)?)),
                "readline" => {
                    let prompt = self.string_arg(&args, 0)?;
                    let text = self.read_console(PromptContext::Input, prompt).await?;
                    Ok(Value::String(text))
                }
                "Sys.sleep" => {
                    let duration = match args.first().map(|a| a.trim()) {
                        None | Some("Inf") => None,
                        Some(secs) => match secs.parse::<f64>() {
                            Ok(secs) if secs.is_finite() && secs >= 0.0 => {
                                Some(Duration::from_secs_f64(secs))
                            }
                            _ => return Err(Unwind::Error("invalid 'time' value".to_string())),
                        },
                    };
                    self.sleep(duration).await?;
                    Ok(Value::Null)
                }
                "q" | "quit" => Err(Unwind::Exit(0)),
                "source" => {
                    let file = self.string_arg(&args, 0)?;
                    self.source(file).await?;
                    Ok(Value::Null)
                }
                "browser" => {
                    self.browse().await?;
                    Ok(Value::Null)
                }
                "plot" => {
                    let mut data = PLOT_MAGIC.to_vec();
                    data.extend_from_slice(args.join(",").as_bytes());
                    let blob_id = self.store_blob(data);
                    self.await_callback(HostCallback::Plot { blob_id }).await?;
                    Ok(Value::Null)
                }
                "rhost:::describe_stack" => Ok(self.describe_stack()),
                "rhost:::enable_breakpoints" => {
                    let flag = self.atom(args.first().map_or("", |a| a.as_str()))?;
                    let enable = flag == Value::Bool(true);
                    self.breakpoints_enabled = enable;
                    Ok(Value::Bool(enable))
                }
                "rhost:::add_breakpoint" => {
                    let location = self.location_args(&args)?;
                    Ok(Value::Bool(self.breakpoints.insert(location)))
                }
                "rhost:::remove_breakpoint" => {
                    let location = self.location_args(&args)?;
                    Ok(Value::Bool(self.breakpoints.remove(&location)))
                }
                "rhost:::show_message" => {
                    let message = self.string_arg(&args, 0)?;
                    self.await_callback(HostCallback::ShowMessage { message }).await?;
                    Ok(Value::Null)
                }
                "rhost:::read_user_input" => {
                    let prompt = self.string_arg(&args, 0)?;
                    match self
                        .await_callback(HostCallback::ReadUserInput {
                            prompt,
                            max_length: 0,
                        })
                        .await?
                    {
                        CallbackReply::Input { text } => Ok(Value::String(text)),
                        _ => Ok(Value::Null),
                    }
                }
                "rhost:::locator" => match self.await_callback(HostCallback::Locator).await? {
                    CallbackReply::Locator { point: Some(p) } => Ok(json!({"x": p.x, "y": p.y})),
                    _ => Ok(Value::Null),
                },
                _ => match self.program.functions.get(&name).cloned() {
                    Some(def) => {
                        let call = format!("{}({})", name, args.join(", "));
                        self.exec_lines(def.file, def.start, def.end, Some(call))
                            .await?;
                        Ok(Value::Null)
                    }
                    None => Err(Unwind::Error(format!("could not find function \"{name}\""))),
                },
            }
        })
    }

    fn location_args(&self, args: &[String]) -> Result<(String, u32), Unwind> {
        let file = self.string_arg(args, 0)?;
        let line = match self.atom(args.get(1).map_or("", |a| a.as_str()))? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        };
        match line {
            Some(line) => Ok((file, line)),
            None => Err(Unwind::Error("invalid line number".to_string())),
        }
    }

    async fn source(&mut self, file: String) -> Result<(), Unwind> {
        let len = match self.program.files.get(&file) {
            Some(lines) => lines.len() as u32,
            None => {
                return Err(Unwind::Error(format!(
                    "cannot open file '{file}': No such file or directory"
                )))
            }
        };
        self.exec_lines(file, 1, len, None).await
    }

    /// Execute lines `start..=end` of `file` in a new frame.
    fn exec_lines(
        &mut self,
        file: String,
        start: u32,
        end: u32,
        call: Option<String>,
    ) -> Step<'_, ()> {
        Box::pin(async move {
            self.frames.push(Frame {
                file: file.clone(),
                line: start,
                call,
            });
            let result = self.exec_frame_body(&file, start, end).await;
            self.frames.pop();
            if self.frames.is_empty() {
                self.step = StepMode::Run;
            }
            result
        })
    }

    async fn exec_frame_body(&mut self, file: &str, start: u32, end: u32) -> Result<(), Unwind> {
        for line in start..=end {
            if let Some(frame) = self.frames.last_mut() {
                frame.line = line;
            }
            let text = self
                .program
                .files
                .get(file)
                .and_then(|lines| lines.get((line as usize).saturating_sub(1)))
                .cloned()
                .unwrap_or_default();
            if self.should_pause(file, line) {
                self.stdout(format!("debug at {file}#{line}: {}\n", text.trim()))?;
                self.browse().await?;
            }
            self.exec_expr(text).await?;
        }
        Ok(())
    }

    fn should_pause(&self, file: &str, line: u32) -> bool {
        let depth = self.frames.len();
        let at_breakpoint =
            self.breakpoints_enabled && self.breakpoints.contains(&(file.to_string(), line));
        let stepping = match self.step {
            StepMode::Run => false,
            StepMode::Into => true,
            StepMode::Over(d) => depth <= d,
            StepMode::Out(d) => depth < d,
        };
        at_breakpoint || stepping
    }

    /// Serve a browser prompt until a resume command arrives.
    fn browse(&mut self) -> Step<'_, ()> {
        Box::pin(async move {
            self.step = StepMode::Run;
            let depth = self.frames.len();
            loop {
                let text = format!("Browse[{}]> ", depth.max(1));
                let command = self.read_console(PromptContext::Browse, text).await?;
                match command.trim() {
                    "n" | "" => {
                        self.step = StepMode::Over(depth);
                        return Ok(());
                    }
                    "s" => {
                        self.step = StepMode::Into;
                        return Ok(());
                    }
                    "f" => {
                        self.step = StepMode::Out(depth);
                        return Ok(());
                    }
                    "c" | "cont" => return Ok(()),
                    "Q" => return Err(Unwind::Interrupted),
                    other => match self.exec_expr(other.to_string()).await {
                        Ok(value) if !value.is_null() => {
                            self.stdout(format!("[1] {}\n", show(&value)))?
                        }
                        Ok(_) => {}
                        Err(Unwind::Error(message)) => self.stderr(format!("Error: {message}\n"))?,
                        Err(other) => return Err(other),
                    },
                }
            }
        })
    }

    /// Frames outermost first, as `rhost:::describe_stack()` reports them.
    fn describe_stack(&self) -> Value {
        let mut out = Vec::new();
        let mut rest = self.frames.iter().peekable();
        match rest.peek() {
            Some(first) if first.call.is_none() => {
                out.push(json!({
                    "filename": first.file,
                    "line_number": first.line,
                    "call": null,
                    "env_name": "R_GlobalEnv",
                    "is_global": true,
                }));
                let mut calls = vec![format!("source(\"{}\")", first.file)];
                calls.extend(SOURCING_CALLS.iter().map(|c| c.to_string()));
                for call in calls {
                    out.push(json!({
                        "filename": first.file,
                        "line_number": first.line,
                        "call": call,
                        "env_name": "<environment>",
                        "is_global": false,
                    }));
                }
                rest.next();
            }
            _ => out.push(json!({
                "filename": null,
                "line_number": null,
                "call": null,
                "env_name": "R_GlobalEnv",
                "is_global": true,
            })),
        }
        for frame in rest {
            out.push(json!({
                "filename": frame.file,
                "line_number": frame.line,
                "call": frame.call,
                "env_name": "<environment>",
                "is_global": false,
            }));
        }
        Value::Array(out)
    }
}

fn is_visible(line: &str) -> bool {
    let line = line.trim();
    split_assignment(line).is_none()
        && !["cat(", "print(", "source(", "invisible("]
            .iter()
            .any(|p| line.starts_with(p))
}

fn show(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn literal(expr: &str) -> Option<Value> {
    match expr {
        "TRUE" => return Some(Value::Bool(true)),
        "FALSE" => return Some(Value::Bool(false)),
        "NULL" => return Some(Value::Null),
        _ => {}
    }
    for quote in ['"', '\''] {
        if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
            return Some(Value::String(expr[1..expr.len() - 1].replace("\\n", "\n")));
        }
    }
    if let Ok(n) = expr.parse::<i64>() {
        return Some(json!(n));
    }
    expr.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn split_assignment(expr: &str) -> Option<(&str, &str)> {
    let (lhs, rhs) = expr.split_once("<-")?;
    let lhs = lhs.trim();
    let is_name = !lhs.is_empty()
        && lhs
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    is_name.then_some((lhs, rhs.trim()))
}

/// `name(arg, arg)` with quote- and paren-aware argument splitting.
fn parse_call(expr: &str) -> Option<(String, Vec<String>)> {
    let open = expr.find('(')?;
    if !expr.ends_with(')') {
        return None;
    }
    let name = expr[..open].trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':'));
    if !valid {
        return None;
    }
    let inner = &expr[open + 1..expr.len() - 1];
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '(') => {
                depth += 1;
                current.push(c);
            }
            (None, ')') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, ',') if depth == 0 => args.push(std::mem::take(&mut current).trim().to_string()),
            (None, c) => current.push(c),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    Some((name.to_string(), args))
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
