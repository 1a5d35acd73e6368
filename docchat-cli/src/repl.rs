//! Interactive chat loop
//!
//! Every line read is handled on its own: either a slash command that
//! inspects or changes the session, or a question for the answer chain.
//! Failures are printed and the loop goes on.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::Result;
use docchat_lib::{
    chain::{MemoryStatus, QueryResult},
    chunk::Fragment,
    embed::Embedder,
    llm::{LlmProvider, Model},
    session::{Role, Session},
    store::VectorStore,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HELP: &str = "\
Commands:
  /help               show this help
  /model [id]         show or switch the Gemini model
  /temperature <t>    set the sampling temperature (0 to 1)
  /top-k <k>          set how many fragments are retrieved
  /clear              forget the chat history and memory summary
  /upload <path>      add a document to the data folder and the index
  /status             show settings and index size
  /history            show the conversation so far
  /quit               leave
Anything else is asked as a question.";

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Ask(String),
    Help,
    ShowModel,
    SetModel(Model),
    SetTemperature(f32),
    SetTopK(usize),
    Clear,
    Upload(PathBuf),
    Status,
    History,
    Quit,
}

impl Input {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Input::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Input::Ask(line.to_string()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        let required = |what: &str| {
            if arg.is_empty() {
                Err(format!("usage: /{name} <{what}>"))
            } else {
                Ok(arg)
            }
        };

        match name {
            "help" | "?" => Ok(Input::Help),
            "model" if arg.is_empty() => Ok(Input::ShowModel),
            "model" => arg.parse().map(Input::SetModel).map_err(|e| e.to_string()),
            "temperature" | "temp" => required("t")?
                .parse()
                .map(Input::SetTemperature)
                .map_err(|_| format!("not a number: {arg}")),
            "top-k" | "topk" | "k" => required("k")?
                .parse()
                .map(Input::SetTopK)
                .map_err(|_| format!("not a whole number: {arg}")),
            "clear" | "reset" => Ok(Input::Clear),
            "upload" => Ok(Input::Upload(PathBuf::from(required("path")?))),
            "status" => Ok(Input::Status),
            "history" => Ok(Input::History),
            "quit" | "exit" | "q" => Ok(Input::Quit),
            _ => Err(format!("unknown command /{name}, try /help")),
        }
    }
}

/// Read lines until `/quit`, Ctrl-C or end of input.
pub fn run<E, S, L>(session: &mut Session<E, S, L>, data_dir: &Path) -> Result<()>
where
    E: Embedder,
    S: VectorStore,
    L: LlmProvider,
{
    let mut editor = DefaultEditor::new()?;
    println!("Ask anything about your documents. /help lists commands, /quit leaves.");

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            editor.add_history_entry(line.as_str())?;
        }

        let input = match Input::parse(&line) {
            Ok(input) => input,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        if handle(session, input, data_dir).is_break() {
            break;
        }
    }
    Ok(())
}

fn handle<E, S, L>(session: &mut Session<E, S, L>, input: Input, data_dir: &Path) -> ControlFlow<()>
where
    E: Embedder,
    S: VectorStore,
    L: LlmProvider,
{
    match input {
        Input::Empty => {}
        Input::Quit => return ControlFlow::Break(()),
        Input::Help => println!("{HELP}"),

        Input::Ask(question) => match session.ask(&question) {
            Ok(result) => print_answer(&result),
            Err(e) => {
                tracing::debug!(error = %e, "question failed");
                println!("error: {e}");
            }
        },

        Input::ShowModel => {
            for model in Model::ALL {
                let marker = if model == session.config().model { "*" } else { " " };
                println!("{marker} {model}");
            }
        }
        Input::SetModel(model) => {
            session.set_model(model);
            println!("model set to {model}");
        }
        Input::SetTemperature(t) => match session.set_temperature(t) {
            Ok(()) => println!("temperature set to {}", session.config().temperature),
            Err(e) => println!("error: {e}"),
        },
        Input::SetTopK(k) => match session.set_top_k(k) {
            Ok(()) => println!("top-k set to {}", session.config().top_k),
            Err(e) => println!("error: {e}"),
        },

        Input::Clear => {
            session.clear();
            println!("chat history and memory cleared");
        }
        Input::Upload(path) => match session.upload(&path, data_dir) {
            Ok(upload) if upload.added == 0 => println!(
                "{} is already indexed, nothing new to add",
                upload.stored_at.display()
            ),
            Ok(upload) => println!(
                "added {} new fragments from {}",
                upload.added,
                upload.stored_at.display()
            ),
            Err(e) => println!("error: {e}"),
        },

        Input::Status => {
            let config = session.config();
            println!("model:       {}", config.model);
            println!("temperature: {}", config.temperature);
            println!("top-k:       {}", config.top_k);
            println!("fragments:   {}", session.store().len());
            println!("turns:       {}", session.turns().len());
            let summary = session.summary();
            println!("memory:      {}", if summary.is_empty() { "(empty)" } else { summary });
        }
        Input::History => {
            if session.turns().is_empty() {
                println!("(no messages yet)");
            }
            for turn in session.turns() {
                let who = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                };
                println!("{who}: {}", turn.content);
            }
        }
    }
    ControlFlow::Continue(())
}

fn print_answer(result: &QueryResult) {
    println!("\n{}\n", result.answer);
    if !result.sources.is_empty() {
        println!("Sources:");
        for (i, source) in result.sources.iter().enumerate() {
            println!("  {}", source_line(i, source));
        }
        println!();
    }
    if let MemoryStatus::Degraded(reason) = &result.memory {
        eprintln!("note: conversation memory was not updated: {reason}");
    }
}

/// `[n] path (p.N)`, numbered from 1 to match the citations in the answer.
fn source_line(i: usize, fragment: &Fragment) -> String {
    format!(
        "[{}] {} (p.{})",
        i + 1,
        fragment.metadata.source_path,
        fragment.metadata.page_label()
    )
}
