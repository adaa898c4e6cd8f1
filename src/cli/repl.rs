use clap::{CommandFactory, Parser};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use shell_words::split;
use tracing::error;

use crate::cli::{dispatch, Commands};
use crate::error::Result;
use crate::settings::Settings;

/// The command set as typed inside the REPL (no binary name).
#[derive(Parser)]
#[command(name = "lunchsync", no_binary_name = true, disable_help_subcommand = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Commands,
}

enum LoopControl {
    Continue,
    Exit,
}

fn print_help() {
    let cmd = ReplLine::command();
    println!("{}", "Available commands:".bold());
    for sub in cmd.get_subcommands() {
        let name = sub.get_name().to_string();
        if name == "repl" {
            continue;
        }
        let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
        println!("  {name:<10} {about}");
    }
    println!("  {:<10} Show this help message", "help");
    println!("  {:<10} Leave the REPL", "exit, quit");
    println!("\nRun `<command> --help` for the arguments of a command.");
}

fn handle_line(settings: &mut Settings, line: &str) -> LoopControl {
    let tokens = match split(line) {
        Ok(t) => t,
        Err(e) => {
            println!("{} {e}", "Could not parse input:".red());
            return LoopControl::Continue;
        }
    };
    let Some(first) = tokens.first() else {
        return LoopControl::Continue;
    };

    match first.to_lowercase().as_str() {
        "exit" | "quit" => return LoopControl::Exit,
        "help" | "?" => {
            print_help();
            return LoopControl::Continue;
        }
        _ => {}
    }

    match ReplLine::try_parse_from(&tokens) {
        Ok(ReplLine {
            command: Commands::Repl,
        }) => println!("Already in the REPL."),
        Ok(parsed) => {
            if let Err(e) = dispatch(parsed.command, settings) {
                error!(error = %e, "command failed");
                println!("{} {e}", "Error:".red());
            }
        }
        Err(e) => {
            let _ = e.print();
        }
    }
    LoopControl::Continue
}

pub fn run(settings: &mut Settings) -> Result<()> {
    println!("{}", "Welcome to the lunchsync REPL!".bold());
    println!("Type 'help' for commands, 'exit' or 'quit' to leave.\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                if let LoopControl::Exit = handle_line(settings, trimmed) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
