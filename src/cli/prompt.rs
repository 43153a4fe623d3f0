use anyhow::Result;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::io::{self, BufRead, IsTerminal, StdinLock, Stdout, Write};

/// Line-oriented operator prompts over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    terminal: bool,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stdout(),
            terminal: io::stdin().is_terminal(),
        }
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            terminal: false,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, message: impl std::fmt::Display) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            anyhow::bail!("Input closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn show_prompt(&mut self, prompt: &str) -> Result<()> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        Ok(())
    }

    pub fn ask(&mut self, label: &str) -> Result<String> {
        self.show_prompt(&format!("{}: ", label))?;
        Ok(self.read_line()?.trim().to_string())
    }

    /// Empty answer means `default`.
    pub fn ask_default(&mut self, label: &str, default: &str) -> Result<String> {
        self.show_prompt(&format!("{} [{}]: ", label, default))?;
        let answer = self.read_line()?.trim().to_string();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Like [`Prompter::ask`] but without echo when attached to a terminal.
    pub fn ask_secret(&mut self, label: &str) -> Result<String> {
        self.show_prompt(&format!("{}: ", label))?;

        let guard = if self.terminal {
            match EchoGuard::disable() {
                Ok(guard) => Some(guard),
                Err(e) => {
                    tracing::debug!(error = %e, "Could not disable terminal echo");
                    None
                }
            }
        } else {
            None
        };

        let answer = self.read_line();
        if guard.is_some() {
            drop(guard);
            writeln!(self.output)?;
        }
        answer
    }

    pub fn confirm(&mut self, label: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} (y/n)", label))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Turns terminal echo off for stdin until dropped.
struct EchoGuard {
    original: Termios,
}

impl EchoGuard {
    fn disable() -> nix::Result<Self> {
        let stdin = io::stdin();
        let original = termios::tcgetattr(&stdin)?;

        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &silent)?;

        Ok(Self { original })
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.original);
    }
}
