//! Line-oriented search loop.
//!
//! Input lines and fetch reports are handled on the same task, so the
//! controller is never touched concurrently. Typing a new city while a
//! search is running cancels that search.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use weather_core::SearchController;

use crate::render;

const HELP: &str =
    "Type a city and press Enter. Commands: :clear, :key <KEY>, :status, :help, :quit";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Search(&'a str),
    Key(&'a str),
    Clear,
    Status,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix(':') else {
        return Input::Search(line);
    };

    let (name, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "q" | "quit" | "exit" => Input::Quit,
        "clear" => Input::Clear,
        "key" => Input::Key(arg.trim()),
        "status" => Input::Status,
        "h" | "help" => Input::Help,
        _ => Input::Unknown(name),
    }
}

fn print_status(controller: &SearchController) {
    if controller.show_key_prompt() {
        println!("No API key found. Enter `:key <YOUR_KEY>`; it is stored locally.");
    }
    println!("{}", render::render_state(controller.state()));
}

pub async fn run(controller: &mut SearchController) -> anyhow::Result<()> {
    println!("{HELP}");

    controller.restore();
    print_status(controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };

                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    Input::Unknown(name) => {
                        println!("Unknown command `:{name}`. {HELP}");
                        continue;
                    }
                    Input::Status => {
                        println!("{}", controller.status_announcement());
                        continue;
                    }
                    Input::Clear => controller.clear(),
                    Input::Key(key) => {
                        if !controller.save_credential(key) {
                            println!("Empty key, nothing saved.");
                            continue;
                        }
                    }
                    Input::Search(city) => {
                        controller.set_query(city);
                        controller.submit();
                    }
                }

                print_status(controller);
            }
            changed = controller.next_completion() => {
                if changed {
                    print_status(controller);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_searches() {
        assert_eq!(parse_input("  New York "), Input::Search("  New York "));
        assert_eq!(parse_input(""), Input::Search(""));
    }

    #[test]
    fn commands() {
        assert_eq!(parse_input(":quit"), Input::Quit);
        assert_eq!(parse_input(":q"), Input::Quit);
        assert_eq!(parse_input(" :clear "), Input::Clear);
        assert_eq!(parse_input(":key   abc123 "), Input::Key("abc123"));
        assert_eq!(parse_input(":key"), Input::Key(""));
        assert_eq!(parse_input(":status"), Input::Status);
        assert_eq!(parse_input(":weather"), Input::Unknown("weather"));
    }
}
