//! Terminal rendering of [ViewModel]s.

use std::{
    fmt::Write as _,
    io::{self, IsTerminal, Write},
};

use ansi_term::{Colour, Style};
use tracing::error;

use crate::{
    daemon::{commands::COMMAND_HELP, sink::ViewSink},
    engine::{
        aggregate::{AggregateLine, GroupBody, Highlight, ViewModel},
        settings::Settings,
    },
    utils::time::format_seconds,
};

const INDENT: &str = "  ";
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn style_of(highlight: Highlight) -> Style {
    match highlight {
        Highlight::None => Style::new(),
        Highlight::Current => Colour::Green.bold(),
        Highlight::CurrentAfk => Colour::Red.bold(),
    }
}

/// Turns views into text. Without colours highlighted lines are marked with `>` and `z` instead.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub colored: bool,
}

impl Renderer {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Colours only when writing to a terminal.
    pub fn for_stdout() -> Self {
        Self::new(io::stdout().is_terminal())
    }

    fn line(&self, out: &mut String, indent: usize, text: String, highlight: Highlight) {
        let prefix = INDENT.repeat(indent);
        let _ = if self.colored {
            writeln!(out, "{prefix}{}", style_of(highlight).paint(text))
        } else {
            let marker = match highlight {
                Highlight::None => ' ',
                Highlight::Current => '>',
                Highlight::CurrentAfk => 'z',
            };
            writeln!(out, "{marker}{prefix}{text}")
        };
    }

    fn aggregate(&self, out: &mut String, indent: usize, name: &str, line: &AggregateLine) {
        self.line(
            out,
            indent,
            format!(
                "[{name}]: {} ({} entries)",
                format_seconds(line.total),
                line.count
            ),
            line.highlight,
        );
    }

    pub fn render(&self, view: &ViewModel) -> String {
        let mut out = String::new();
        let totals = &view.totals;

        self.line(
            &mut out,
            0,
            format!(
                "Active: {} | AFK: {}",
                format_seconds(totals.total_active),
                format_seconds(totals.total_afk)
            ),
            Highlight::None,
        );
        self.line(
            &mut out,
            0,
            format!(
                "Since {}, Active {:.2} hrs/day | Total entries: {}",
                totals.reset_date.date_naive(),
                totals.avg_hours_per_day,
                totals.entry_count
            ),
            Highlight::None,
        );
        out.push('\n');

        for group in &view.groups {
            self.line(
                &mut out,
                0,
                format!("{} - {}", group.name, format_seconds(group.total)),
                group.highlight,
            );
            match &group.body {
                GroupBody::Collapsed => self.line(
                    &mut out,
                    1,
                    format!("[{} entries] (collapsed)", group.member_count),
                    Highlight::None,
                ),
                GroupBody::Expanded { top, others } => {
                    for entry in top {
                        self.line(
                            &mut out,
                            1,
                            format!("{}: {}", entry.label, format_seconds(entry.duration)),
                            entry.highlight,
                        );
                    }
                    if let Some(others) = others.as_ref().filter(|v| v.count > 0) {
                        self.aggregate(&mut out, 1, &format!("{} Other", group.name), others);
                    }
                }
            }
        }

        if view.insignificant.count > 0 {
            self.aggregate(&mut out, 0, "Global Insignificant Other", &view.insignificant);
        }
        out
    }
}

/// Redraws the whole terminal on every render, keeping the last command result at the bottom.
pub struct TerminalSink {
    renderer: Renderer,
    message: Option<String>,
}

impl TerminalSink {
    pub fn new() -> Self {
        #[cfg(windows)]
        let _ = ansi_term::enable_ansi_support();
        Self {
            renderer: Renderer::for_stdout(),
            message: None,
        }
    }

    fn screen(&self, view: &ViewModel, settings: &Settings) -> String {
        let mut screen = String::from(CLEAR_SCREEN);
        screen.push_str(&self.renderer.render(view));
        let _ = writeln!(
            screen,
            "\nAFK after {}s, saving every {}s",
            settings.afk_timeout, settings.save_interval
        );
        if let Some(message) = &self.message {
            let _ = writeln!(screen, "{message}");
        }
        let _ = writeln!(screen, "{COMMAND_HELP}");
        screen
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewSink for TerminalSink {
    fn present(&mut self, view: &ViewModel, settings: &Settings) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout
            .write_all(self.screen(view, settings).as_bytes())
            .and_then(|_| stdout.flush())
        {
            error!("Failed to draw view {e:?}");
        }
    }

    fn notify(&mut self, message: &str) {
        self.message = Some(message.to_string());
    }
}
