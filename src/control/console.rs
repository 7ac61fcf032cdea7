//! Console dispatcher
//!
//! Turns console lines into facade calls and reports every outcome through
//! the log sink. A failed order is logged and the console carries on.

use super::command::{help_lines, Command};
use super::sink::{LogLevel, LogSink};
use super::{ControlFacade, ControlResult};
use crate::registry::Listing;

/// Whether the console should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a> {
    facade: &'a ControlFacade,
}

impl<'a> Console<'a> {
    pub fn new(facade: &'a ControlFacade) -> Self {
        Self { facade }
    }

    fn sink(&self) -> &dyn LogSink {
        self.facade.sink()
    }

    /// Handle one console line
    pub fn handle_line(&self, line: &str) -> Flow {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                self.sink().log(LogLevel::Error, &e.to_string());
                return Flow::Continue;
            }
        };

        self.sink().log(LogLevel::Debug, line.trim());
        self.sink()
            .log(LogLevel::Debug, &format!("calling handler for {:?}", command));

        match self.execute(command) {
            Ok(flow) => {
                self.sink().log(LogLevel::Debug, "done");
                flow
            }
            Err(e) => {
                self.sink().log(LogLevel::Error, &e.to_string());
                Flow::Continue
            }
        }
    }

    fn execute(&self, command: Command) -> ControlResult<Flow> {
        match command {
            Command::Send { name, args } => {
                let frame = self.facade.send_order(&name, &args)?;
                self.sink()
                    .log(LogLevel::Debug, &format!("sent {} as {}", name, frame));
            }
            Command::Add { args } => {
                let schema = self.facade.add_order(&args)?;
                self.sink()
                    .log(LogLevel::Info, &format!("order {} added", schema));
            }
            Command::List { names } => self.show_listing(self.facade.list_orders(&names)?),
            Command::Log { level } => match level.parse::<LogLevel>() {
                Ok(level) => self.sink().set_level(level),
                Err(e) => self.sink().log(LogLevel::Error, &e.to_string()),
            },
            Command::Clear => self.sink().clear(),
            Command::Help { topics } => {
                for line in help_lines(&topics) {
                    self.sink().log(LogLevel::Info, &line);
                }
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show_listing(&self, listing: Listing) {
        match listing {
            Listing::Names(names) => {
                let mut text = String::from("CAN-Messages");
                for name in names {
                    text.push_str(&format!("\n  order {}", name));
                }
                text.push_str("\nType 'list [ordername]' for more information");
                self.sink().log(LogLevel::Info, &text);
            }
            Listing::Schemas(schemas) => {
                for schema in schemas {
                    self.sink().log(LogLevel::Info, &schema.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::tests::harness;

    #[test]
    fn test_add_send_list_session() {
        let h = harness();
        let console = Console::new(&h.facade);

        assert_eq!(
            console.handle_line("add move 10 destination:i32 speed:i16 acceleration:i16"),
            Flow::Continue
        );
        assert_eq!(console.handle_line("send move 400000 2000 100"), Flow::Continue);
        assert_eq!(h.driver.sent.lock().len(), 1);

        console.handle_line("list");
        console.handle_line("list move");

        let info = h.sink.at(LogLevel::Info);
        assert!(info.iter().any(|l| l.contains("CAN-Messages") && l.contains("  order move")));
        assert!(info
            .iter()
            .any(|l| l == "move id=10 [destination:i32, speed:i16, acceleration:i16]"));
        assert!(h.sink.at(LogLevel::Error).is_empty());
    }

    #[test]
    fn test_errors_are_logged_not_fatal() {
        let h = harness();
        let console = Console::new(&h.facade);

        assert_eq!(console.handle_line("send missing 1"), Flow::Continue);
        assert_eq!(console.handle_line("list missing"), Flow::Continue);
        assert_eq!(console.handle_line("fly away"), Flow::Continue);
        assert_eq!(console.handle_line("log loud"), Flow::Continue);

        assert_eq!(
            h.sink.at(LogLevel::Error),
            [
                "Order missing not existent!",
                "Order missing not existent!",
                "Unknown order \"fly away\"",
                "loglevel loud unknown.",
            ]
        );
        assert!(h.driver.sent.lock().is_empty());
    }

    #[test]
    fn test_log_level_change() {
        let h = harness();
        Console::new(&h.facade).handle_line("log 3");
        assert_eq!(*h.sink.level.lock(), Some(LogLevel::Debug));
    }

    #[test]
    fn test_help_and_quit() {
        let h = harness();
        let console = Console::new(&h.facade);

        console.handle_line("help");
        assert_eq!(h.sink.at(LogLevel::Info).len(), 7);
        assert_eq!(console.handle_line("quit"), Flow::Quit);
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let h = harness();
        assert_eq!(Console::new(&h.facade).handle_line("   "), Flow::Continue);
        assert!(h.sink.records.lock().is_empty());
    }
}
