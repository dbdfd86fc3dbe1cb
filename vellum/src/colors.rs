//! Terminal colors, only used when stderr is a terminal.
use colored::{Color, Colorize};
use once_cell::sync::Lazy;
use std::io::IsTerminal;

static TTY: Lazy<bool> = Lazy::new(|| std::io::stderr().is_terminal());

/// Is stderr attached to a terminal?
pub fn tty() -> bool {
    *TTY
}

/// Color text for status output, leaving it plain when it's piped somewhere.
pub trait MaybeColorize {
    fn paint(&self, color: Color) -> String;

    fn green(&self) -> String {
        self.paint(Color::Green)
    }

    fn red(&self) -> String {
        self.paint(Color::Red)
    }

    fn purple(&self) -> String {
        self.paint(Color::Magenta)
    }

    fn yellow(&self) -> String {
        self.paint(Color::Yellow)
    }
}

impl MaybeColorize for str {
    fn paint(&self, color: Color) -> String {
        if tty() {
            self.color(color).to_string()
        } else {
            self.to_string()
        }
    }
}

impl MaybeColorize for String {
    fn paint(&self, color: Color) -> String {
        self.as_str().paint(color)
    }
}
