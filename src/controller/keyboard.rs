// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io;

use parking_lot::Mutex;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::tempo::TimeSignature;

const PLAY: &str = "play";
const PLAY_SHORT: &str = "p";
const FASTER: &str = "+";
const SLOWER: &str = "-";
const BPM: &str = "bpm";
const SIGNATURE: &str = "sig";
const THEME: &str = "theme";
const QUIT: &str = "quit";
const QUIT_SHORT: &str = "q";

type Input = Box<dyn io::BufRead + Send>;

/// A controller that controls the metronome using the keyboard, one command per
/// line.
pub struct Driver {
    /// Where commands are read from. Stdin when unset.
    input: Mutex<Option<Input>>,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            input: Mutex::new(None),
        }
    }

    /// Creates a driver that reads its commands from the given reader.
    pub fn from_reader<R>(reader: R) -> Driver
    where
        R: io::BufRead + Send + 'static,
    {
        Driver {
            input: Mutex::new(Some(Box::new(reader))),
        }
    }

    /// Reads and handles one line of input. Returns false once the input is
    /// exhausted or the user has quit.
    fn monitor_io<R>(events_tx: &Sender<Event>, mut reader: R) -> Result<bool, io::Error>
    where
        R: io::BufRead,
    {
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let event = match parse(&input) {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(true),
            Err(e) => {
                warn!(input = input.trim(), err = %e, "Unrecognized input");
                return Ok(true);
            }
        };

        events_tx
            .blocking_send(event)
            .map_err(io::Error::other)?;
        Ok(event != Event::Quit)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

/// Parses a command line into an event. Blank lines produce no event.
fn parse(input: &str) -> Result<Option<Event>, String> {
    let input = input.trim().to_lowercase();
    let mut words = input.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let event = match (command, argument) {
        (PLAY | PLAY_SHORT, None) => Event::TogglePlay,
        (FASTER, None) => Event::Faster,
        (SLOWER, None) => Event::Slower,
        (BPM, Some(bpm)) => Event::SetTempo(
            bpm.parse()
                .map_err(|_| format!("'{}' is not a tempo", bpm))?,
        ),
        (SIGNATURE, Some(signature)) => Event::SetTimeSignature(
            signature
                .parse::<TimeSignature>()
                .map_err(|e| e.to_string())?,
        ),
        (THEME, None) => Event::ToggleTheme,
        (QUIT | QUIT_SHORT, None) => Event::Quit,
        _ => return Err(format!("unknown command '{}'", input)),
    };

    if words.next().is_some() {
        return Err("too many arguments".to_string());
    }
    Ok(Some(event))
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let input = self.input.lock().take();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");
            println!(
                "Commands: {}/{}, {}, {}, {} <n>, {} <n/d>, {}, {}/{}",
                PLAY, PLAY_SHORT, FASTER, SLOWER, BPM, SIGNATURE, THEME, QUIT, QUIT_SHORT,
            );

            match input {
                Some(mut reader) => while Self::monitor_io(&events_tx, &mut reader)? {},
                None => while Self::monitor_io(&events_tx, io::stdin().lock())? {},
            }

            info!("Keyboard driver finished.");
            Ok(())
        })
    }
}
