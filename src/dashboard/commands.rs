use crate::errors::AppError;
use crate::models::Alignment;

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Index(String),
    Months(u32),
    Alignment(Alignment),
    Refresh,
    Clear,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  index <name|n>                   select an index by name, ticker or list position
  months <1-12>                    set the forecast horizon
  alignment <positional|by-date>   how forecast rows are paired with test rows
  refresh                          drop the cached data for the current index and reload
  clear                            drop the cached data for every index and reload
  list                             show the available indices
  help                             show this message
  quit                             exit";

/// Parse a command line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "index" | "i" => {
            if rest.is_empty() {
                return Err(AppError::Validation("usage: index <name|n>".to_string()));
            }
            Command::Index(rest.to_string())
        }
        "months" | "m" => {
            let months = rest.parse::<u32>().map_err(|_| {
                AppError::Validation(format!("months must be a whole number, got '{}'", rest))
            })?;
            Command::Months(months)
        }
        "alignment" | "align" => {
            let alignment = Alignment::parse(rest).ok_or_else(|| {
                AppError::Validation(format!(
                    "alignment must be 'positional' or 'by-date', got '{}'",
                    rest
                ))
            })?;
            Command::Alignment(alignment)
        }
        "refresh" | "r" => Command::Refresh,
        "clear" => Command::Clear,
        "list" | "ls" => Command::List,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => {
            return Err(AppError::Validation(format!(
                "unknown command '{}' (type 'help')",
                other
            )))
        }
    };
    Ok(Some(command))
}
