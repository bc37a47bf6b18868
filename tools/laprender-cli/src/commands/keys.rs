//! Line-based keyboard input for calibration.
//!
//! Keys:
//!   `,` / `.`   step one frame back / forward
//!   `<` / `>`   coarse step back / forward
//!   `-` / `+`   decrease / increase the offset
//!   `p`, Enter  play / pause
//!   `c`, `q`    commit

use std::io::BufRead;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

use laprender_processing_core::CalibrationCommand;
use laprender_render_engine::{CommandSource, InputEvent};

/// Map one input line to an event.
pub fn parse_key(line: &str, coarse_step: i64) -> InputEvent {
    let command = match line.trim() {
        "," => CalibrationCommand::StepFrame(-1),
        "." => CalibrationCommand::StepFrame(1),
        "<" => CalibrationCommand::StepCoarse(-coarse_step),
        ">" => CalibrationCommand::StepCoarse(coarse_step),
        "-" => CalibrationCommand::AdjustOffset(-1),
        "+" | "=" => CalibrationCommand::AdjustOffset(1),
        "p" | "P" | "" => CalibrationCommand::TogglePlay,
        "c" | "C" | "q" | "Q" => CalibrationCommand::Commit,
        _ => return InputEvent::Unrecognized,
    };
    InputEvent::Command(command)
}

/// Commands read from stdin on a background thread so that playback can
/// poll without blocking.
pub struct StdinCommands {
    lines: Receiver<String>,
    coarse_step: i64,
}

impl StdinCommands {
    pub fn spawn(coarse_step: i64) -> Self {
        let (tx, rx) = channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            lines: rx,
            coarse_step,
        }
    }
}

impl CommandSource for StdinCommands {
    fn wait(&mut self) -> InputEvent {
        match self.lines.recv() {
            Ok(line) => parse_key(&line, self.coarse_step),
            Err(_) => InputEvent::Closed,
        }
    }

    fn poll(&mut self) -> Option<InputEvent> {
        match self.lines.try_recv() {
            Ok(line) => Some(parse_key(&line, self.coarse_step)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(InputEvent::Closed),
        }
    }
}

pub fn print_help(coarse_step: i64) {
    println!("Calibration keys (type one and press Enter):");
    println!("  , .   step one frame        < >   step {coarse_step} frames");
    println!("  - +   change the offset     p     play / pause (also Enter)");
    println!("  c q   commit the offset");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_mapping() {
        use CalibrationCommand::*;
        let cases = [
            (",", StepFrame(-1)),
            (".", StepFrame(1)),
            ("<", StepCoarse(-300)),
            (">", StepCoarse(300)),
            ("-", AdjustOffset(-1)),
            ("+", AdjustOffset(1)),
            ("p", TogglePlay),
            ("", TogglePlay),
            ("c", Commit),
            ("q", Commit),
        ];
        for (key, expected) in cases {
            assert_eq!(parse_key(key, 300), InputEvent::Command(expected), "key {key:?}");
        }
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        assert_eq!(parse_key("x", 300), InputEvent::Unrecognized);
        assert_eq!(parse_key("  .  ", 300), InputEvent::Command(CalibrationCommand::StepFrame(1)));
    }
}
