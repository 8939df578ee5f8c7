use anyhow::Result;
use rustyline::{DefaultEditor, error::ReadlineError};

use pagesim::config::{MemoryConfig, parse_components};
use pagesim::debugger::{DebugLevel, set_components, set_debug_level};
use pagesim::shell::Session;
use pagesim::vm_warn;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let debug_level = args
        .iter()
        .find(|arg| arg.starts_with("--debug="))
        .and_then(|arg| arg.strip_prefix("--debug="))
        .and_then(|level| level.parse::<u8>().ok())
        .map(DebugLevel::from_u8)
        .unwrap_or(DebugLevel::Off);

    set_debug_level(debug_level);

    if let Some(list) = args.iter().find_map(|arg| arg.strip_prefix("--log=")) {
        set_components(&parse_components(list)?);
    }

    let config = MemoryConfig::from_args(&args)?;
    let mut session = Session::new(config.clone())?;
    let mut editor = DefaultEditor::new()?;

    println!("pagesim shell");
    println!(
        "{} frames of {} bytes, {} replacement. Type help, Ctrl+D to exit",
        config.frames, config.page_size, config.policy
    );

    loop {
        let line = match editor.readline("vm> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Err(err) = editor.add_history_entry(input) {
            vm_warn!(Shell, "history entry dropped: {}", err);
        }

        if matches!(input, "quit" | "exit") {
            break;
        }

        match session.execute(input) {
            Ok(output) => println!("{output}"),
            Err(error) => println!("error: {error:#}"),
        }
    }

    Ok(())
}
