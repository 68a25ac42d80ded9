use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tracing::warn;

use crate::engine::Confirm;

/// Asks yes/no questions on a terminal. Anything but an explicit yes counts as no.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

pub type TerminalPrompt = Prompt<StdinLock<'static>, Stdout>;

impl TerminalPrompt {
    pub fn terminal() -> Self {
        Prompt::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "{question} [y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

impl<R: BufRead, W: Write> Confirm for Prompt<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        self.ask(question).unwrap_or_else(|e| {
            warn!("Failed to read an answer {e:?}");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::engine::Confirm;

    use super::Prompt;

    fn answer(input: &str) -> (bool, String) {
        let mut output = Vec::new();
        let confirmed = Prompt::new(Cursor::new(input), &mut output).confirm("Purge 3 entries?");
        (confirmed, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_prompt_answers() {
        assert_eq!(answer("y\n"), (true, "Purge 3 entries? [y/N] ".into()));
        assert!(answer(" YES \n").0);
        assert!(!answer("n\n").0);
        assert!(!answer("\n").0);
        assert!(!answer("").0);
        assert!(!answer("yep\n").0);
    }
}
