/// Human-readable session output: one banner at startup, then one line per
/// completed build (glyph, fixed phrase, build duration).
use crate::config::{Target, UrlConfig};
use crate::elapsed::Elapsed;
use owo_colors::{OwoColorize, Style};
use std::fmt::Display;
use std::io::Write;

pub struct Reporter {
    color: bool,
    out: Box<dyn Write + Send>,
}

impl Reporter {
    /// Reporter printing to stdout.
    pub fn stdout(color: bool) -> Self {
        Self::with_writer(color, Box::new(std::io::stdout()))
    }

    pub fn with_writer(color: bool, out: Box<dyn Write + Send>) -> Self {
        Self { color, out }
    }

    /// Announce which dev server this session is serving.
    pub fn banner(&mut self, target: Target, urls: &UrlConfig) {
        let line = self.banner_line(target, urls);
        self.emit(&line);
    }

    pub fn starting(&mut self, elapsed: Elapsed) {
        let line = format!(
            "  {} Starting node server.   {}",
            self.paint("⏻", Style::new().green()),
            self.gear(elapsed)
        );
        self.emit(&line);
    }

    pub fn restarting(&mut self, elapsed: Elapsed) {
        let line = format!(
            "  {} Restarting node server. {}",
            self.paint("↻", Style::new().cyan()),
            self.gear(elapsed)
        );
        self.emit(&line);
    }

    /// Client builds only report; zero or unmeasurable durations are skipped.
    pub fn client_ready(&mut self, elapsed: Elapsed) {
        if !elapsed.is_positive() {
            return;
        }
        let line = format!(
            "  {} Browser client ready.   {}",
            self.paint("⚛", Style::new().magenta()),
            self.gear(elapsed)
        );
        self.emit(&line);
    }

    fn banner_line(&self, target: Target, urls: &UrlConfig) -> String {
        let magenta = Style::new().magenta();
        let blue = Style::new().blue();
        match target {
            Target::Server => format!(
                "  {} Node koaze server: {}",
                self.paint("⯂", magenta),
                self.paint(urls.server_url.as_str(), blue)
            ),
            Target::Client => format!(
                "  {} Development web server: {}",
                self.paint("⯃", magenta),
                self.paint(urls.assets_url.as_str(), blue)
            ),
        }
    }

    fn gear(&self, elapsed: Elapsed) -> String {
        format!(
            "{} {}{}",
            self.paint("⚙", Style::new().yellow()),
            self.paint(elapsed.value(), Style::new().white()),
            self.paint(elapsed.unit().suffix(), Style::new().bright_black())
        )
    }

    fn paint(&self, text: impl Display, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }

    fn emit(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            tracing::debug!(error = %e, "failed to write report line");
        }
    }
}
