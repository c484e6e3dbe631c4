//! Line commands read from stdin.

use game_client::game::TILE_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    /// Zero-based tile index.
    Pick(usize),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "commands: p = play/stop, 1-4 = pick a tile, s = status, h = help, q = quit";

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "p" | "play" | "stop" => return Some(Command::TogglePlay),
        "s" | "status" => return Some(Command::Status),
        "h" | "help" | "?" => return Some(Command::Help),
        "q" | "quit" | "exit" => return Some(Command::Quit),
        _ => {}
    }

    let tile = line.parse::<usize>().ok()?;
    (1..=TILE_COUNT)
        .contains(&tile)
        .then(|| Command::Pick(tile - 1))
}
