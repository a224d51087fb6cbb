use crate::config::LoggingConfig;
use regex::Regex;
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

struct RedactingWriter<W> {
    inner: W,
    patterns: Vec<(Regex, String)>,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redacted = redact(&String::from_utf8_lossy(buf), &self.patterns);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter {
    patterns: Vec<(Regex, String)>,
}

impl<'a> fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            patterns: self.patterns.clone(),
        }
    }
}

fn redact(line: &str, patterns: &[(Regex, String)]) -> String {
    let mut out = line.to_string();
    for (re, replacement) in patterns {
        out = re.replace_all(&out, replacement.as_str()).into_owned();
    }
    out
}

/// Compile the configured patterns. Invalid expressions are skipped.
fn compile_patterns(config: &LoggingConfig) -> Vec<(Regex, String)> {
    if !config.redaction.enabled {
        return Vec::new();
    }
    config
        .redaction
        .patterns
        .iter()
        .filter_map(|p| match Regex::new(&p.regex) {
            Ok(re) => Some((re, p.placeholder.clone())),
            Err(e) => {
                eprintln!("warning: ignoring redaction pattern '{}': {}", p.name, e);
                None
            }
        })
        .collect()
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let make_writer = RedactingMakeWriter {
        patterns: compile_patterns(config),
    };

    let base = fmt::layer()
        .with_writer(make_writer)
        .with_ansi(false)
        .with_target(config.show_target);

    // Use Layer::boxed() to unify the types of the match arms
    let fmt_layer = match (config.json, config.show_time) {
        (true, true) => base.json().boxed(),
        (true, false) => base.json().without_time().boxed(),
        (false, true) => base.boxed(),
        (false, false) => base.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
