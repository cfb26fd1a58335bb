//! Interactive mode: one session, one command at a time.

use super::{bold, clear_spinner, cyan, dim, green, red, report_failure, yellow, CliObserver};
use anyhow::{Context, Result};
use doc2json::{
    write_artifact, ChatCompletionsClient, Doc2JsonError, GenerationConfig, ModelId, Session,
    Stage,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// What `show` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowTarget {
    Text,
    Schema,
    Json,
}

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Document(PathBuf),
    Schema(PathBuf),
    Generate,
    Show(ShowTarget),
    Save(Option<PathBuf>),
    Status,
    Model(ModelId),
    Help,
    Exit,
}

/// Run the interactive loop until `exit` or end of input.
pub async fn run_repl(
    session: &mut Session,
    client: &ChatCompletionsClient,
    mut config: GenerationConfig,
    spinner: Option<&CliObserver>,
) -> Result<()> {
    println!(
        "{}",
        cyan("doc2json interactive mode. Type 'help' for commands, 'exit' to quit")
    );
    if !config.has_api_key() {
        println!(
            "{} No API key set. Export GROQ_API_KEY or restart with --api-key.",
            yellow("⚠")
        );
    }
    println!();

    let mut editor = DefaultEditor::new().context("Failed to initialise line editor")?;

    loop {
        let prompt = format!("doc2json [{}]> ", stage_label(session.stage()));
        match editor.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                match parse_repl_command(line) {
                    Ok(ReplCommand::Exit) => break,
                    Ok(ReplCommand::Help) => print_help(),
                    Ok(cmd) => {
                        let outcome = execute(cmd, session, client, &mut config).await;
                        clear_spinner(spinner);
                        if let Err(e) = outcome {
                            report_failure(&e);
                        }
                    }
                    Err(msg) => eprintln!("{}", red(&msg)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", dim("Use 'exit' to quit"));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        }
    }

    Ok(())
}

fn parse_repl_command(line: &str) -> Result<ReplCommand, String> {
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let path_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("Usage: {head} <path to {what}>"))
        } else {
            Ok(PathBuf::from(rest))
        }
    };

    match head {
        "exit" | "quit" | "q" => Ok(ReplCommand::Exit),
        "help" | "?" => Ok(ReplCommand::Help),
        "document" | "doc" => path_arg("document").map(ReplCommand::Document),
        "schema" => path_arg("schema file").map(ReplCommand::Schema),
        "generate" | "gen" => Ok(ReplCommand::Generate),
        "status" => Ok(ReplCommand::Status),
        "save" => Ok(ReplCommand::Save(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        "show" => match rest {
            "text" => Ok(ReplCommand::Show(ShowTarget::Text)),
            "schema" => Ok(ReplCommand::Show(ShowTarget::Schema)),
            "json" => Ok(ReplCommand::Show(ShowTarget::Json)),
            _ => Err("Usage: show text|schema|json".to_string()),
        },
        "model" => rest
            .parse::<ModelId>()
            .map(ReplCommand::Model)
            .map_err(|e| e.to_string()),
        other => Err(format!(
            "Unknown command: {other}. Type 'help' for available commands."
        )),
    }
}

async fn execute(
    cmd: ReplCommand,
    session: &mut Session,
    client: &ChatCompletionsClient,
    config: &mut GenerationConfig,
) -> Result<(), Doc2JsonError> {
    match cmd {
        ReplCommand::Document(path) => {
            let chars = session.load_document_file(&path).await?.chars().count();
            println!(
                "{} Extracted {} {}",
                green("✓"),
                bold(&path.display().to_string()),
                dim(&format!("{chars} chars")),
            );
        }
        ReplCommand::Schema(path) => {
            session.load_schema_file(&path).await?;
            println!(
                "{} Loaded schema {}",
                green("✓"),
                bold(&path.display().to_string())
            );
        }
        ReplCommand::Generate => {
            session.generate(client, config).await?;
            println!("{} JSON generated with {}", green("✓"), config.model);
            print_optional(session.render_generated(), "generated JSON");
        }
        ReplCommand::Show(ShowTarget::Text) => {
            print_optional(session.extracted_text().map(str::to_string), "extracted text");
        }
        ReplCommand::Show(ShowTarget::Schema) => {
            print_optional(session.render_schema(), "schema");
        }
        ReplCommand::Show(ShowTarget::Json) => {
            print_optional(session.render_generated(), "generated JSON");
        }
        ReplCommand::Save(dest) => match session.download() {
            Some(artifact) => {
                let dest = dest.unwrap_or_else(|| PathBuf::from("."));
                let path = write_artifact(&artifact, &dest).await?;
                println!("{} Saved {}", green("✔"), bold(&path.display().to_string()));
            }
            None => println!("{}", dim("Nothing to save yet: run 'generate' first")),
        },
        ReplCommand::Status => print_status(session, config),
        ReplCommand::Model(model) => {
            config.model = model;
            println!("{} Model set to {}", green("✓"), model);
        }
        ReplCommand::Help | ReplCommand::Exit => {}
    }
    Ok(())
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Idle => "no document",
        Stage::DocumentLoaded => "document",
        Stage::SchemaLoaded => "ready",
        Stage::Generated => "generated",
    }
}

fn print_optional(body: Option<String>, what: &str) {
    match body {
        Some(body) => println!("{body}"),
        None => println!("{}", dim(&format!("No {what} yet"))),
    }
}

fn print_status(session: &Session, config: &GenerationConfig) {
    let yes_no = |b: bool| if b { green("yes") } else { dim("no") };
    println!("Document:   {}", session.document_name().unwrap_or("-"));
    println!("Text:       {}", yes_no(session.extracted_text().is_some()));
    println!("Schema:     {}", yes_no(session.json_schema().is_some()));
    println!("JSON:       {}", yes_no(session.generated_json().is_some()));
    if session.failed() {
        println!("Last run:   {}", red("failed"));
    }
    println!("Model:      {}", config.model);
    println!("API key:    {}", yes_no(config.has_api_key()));
}

fn print_help() {
    println!("{}", bold("Commands:"));
    println!("  document <path>      Load a document and extract its text");
    println!("  schema <path>        Load the JSON schema (after a document)");
    println!("  generate             Ask the model for JSON following the schema");
    println!("  show text|schema|json");
    println!("                       Print the extracted text, schema or result");
    println!("  save [path]          Write the result (default: ./<document>_structured.json)");
    println!("  status               Show what is loaded");
    println!("  model <id>           Switch model: {}", model_list());
    println!("  help                 Show this help");
    println!("  exit                 Quit");
}

fn model_list() -> String {
    ModelId::ALL
        .iter()
        .map(ModelId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
