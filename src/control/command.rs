//! Console command grammar
//!
//! ```text
//! send <name> <arg>...
//! add <name> <id> <param:type>...
//! list [<name>...]
//! log <level>
//! clear
//! help [<name>...]
//! quit
//! ```

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown order \"{0}\"")]
    Unknown(String),

    #[error("{order}: missing {argument}. Usage: {usage}")]
    MissingArgument {
        order: &'static str,
        argument: &'static str,
        usage: &'static str,
    },
}

pub type CommandResult<T> = Result<T, CommandError>;

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { name: String, args: Vec<String> },
    Add { args: Vec<String> },
    List { names: Vec<String> },
    Log { level: String },
    Clear,
    Help { topics: Vec<String> },
    Quit,
}

/// Order keyword, usage line, description
const ORDERS: [(&str, &str, &str); 7] = [
    ("send", "send <name> <arg>...", "Send a message"),
    ("list", "list [<name>...]", "List known messages"),
    ("add", "add <name> <id> <param:type>...", "Add a message"),
    ("clear", "clear", "Clear message screen"),
    ("log", "log <error|warning|info|debug>", "Set log level"),
    ("help", "help [<order>...]", "Show this help"),
    ("quit", "quit", "Exit the program"),
];

fn usage(order: &str) -> &'static str {
    ORDERS
        .iter()
        .find(|(name, _, _)| *name == order)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("")
}

impl Command {
    /// Parse one console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> CommandResult<Option<Self>> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let Some(order) = tokens.next() else {
            return Ok(None);
        };
        let mut rest: Vec<String> = tokens.collect();

        let command = match order.as_str() {
            "send" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        order: "send",
                        argument: "order name",
                        usage: usage("send"),
                    });
                }
                let name = rest.remove(0);
                Command::Send { name, args: rest }
            }
            "add" => Command::Add { args: rest },
            "list" => Command::List { names: rest },
            "log" => match rest.into_iter().next() {
                Some(level) => Command::Log { level },
                None => {
                    return Err(CommandError::MissingArgument {
                        order: "log",
                        argument: "level",
                        usage: usage("log"),
                    })
                }
            },
            "clear" => Command::Clear,
            "help" => Command::Help { topics: rest },
            "quit" => Command::Quit,
            _ => return Err(CommandError::Unknown(line.trim().to_string())),
        };

        Ok(Some(command))
    }
}

/// Help lines for `topics`, or for every order when empty
pub fn help_lines(topics: &[String]) -> Vec<String> {
    if topics.is_empty() {
        return ORDERS
            .iter()
            .map(|(name, _, description)| format!("{:<5}: {}", name, description))
            .collect();
    }

    topics
        .iter()
        .map(|topic| match ORDERS.iter().find(|(name, _, _)| name == topic) {
            Some((_, usage, description)) => format!("{} - {}", usage, description),
            None => format!("no help for \"{}\"", topic),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_send() {
        assert_eq!(
            parse("send move 400000 2000 100"),
            Command::Send {
                name: "move".into(),
                args: vec!["400000".into(), "2000".into(), "100".into()],
            }
        );
        assert_eq!(
            parse("send stop"),
            Command::Send {
                name: "stop".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn test_parse_send_without_name() {
        assert!(matches!(
            Command::parse("send"),
            Err(CommandError::MissingArgument { order: "send", .. })
        ));
    }

    #[test]
    fn test_parse_add_keeps_tokens() {
        assert_eq!(
            parse("add move 10 destination:i32 speed:i16"),
            Command::Add {
                args: vec![
                    "move".into(),
                    "10".into(),
                    "destination:i32".into(),
                    "speed:i16".into()
                ],
            }
        );
    }

    #[test]
    fn test_parse_list_and_help() {
        assert_eq!(parse("list"), Command::List { names: Vec::new() });
        assert_eq!(
            parse("list move stop"),
            Command::List {
                names: vec!["move".into(), "stop".into()]
            }
        );
        assert_eq!(
            parse("help send"),
            Command::Help {
                topics: vec!["send".into()]
            }
        );
    }

    #[test]
    fn test_parse_simple_orders() {
        assert_eq!(parse("clear"), Command::Clear);
        assert_eq!(parse("quit"), Command::Quit);
        assert_eq!(parse("log debug"), Command::Log { level: "debug".into() });
        assert!(Command::parse("log").is_err());
    }

    #[test]
    fn test_parse_extra_whitespace() {
        assert_eq!(
            parse("  send   move  1 "),
            Command::Send {
                name: "move".into(),
                args: vec!["1".into()]
            }
        );
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_unknown_order() {
        assert_eq!(
            Command::parse("jump 3"),
            Err(CommandError::Unknown("jump 3".into()))
        );
    }

    #[test]
    fn test_help_lines() {
        assert_eq!(help_lines(&[]).len(), ORDERS.len());
        assert_eq!(help_lines(&[]).first().map(String::as_str), Some("send : Send a message"));

        let lines = help_lines(&["add".into(), "fly".into()]);
        assert_eq!(lines[0], "add <name> <id> <param:type>... - Add a message");
        assert_eq!(lines[1], "no help for \"fly\"");
    }
}
