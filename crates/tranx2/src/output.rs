use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tracing::warn;
use tranx2_client::Handler;
use tranx2_codec::{DecodeError, Message, Passing};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RecordOutput {
    Passing {
        transponder_id: u32,
        passing_ticks: u32,
        hits: u8,
        strength: u8,
        prefix: u16,
        trailing: u8,
    },
    Noise {
        noise: u16,
    },
}

impl From<&Message> for RecordOutput {
    fn from(msg: &Message) -> Self {
        match *msg {
            Message::Passing(Passing {
                transponder_id,
                passing_ticks,
                hits,
                strength,
                prefix,
                trailing,
            }) => RecordOutput::Passing {
                transponder_id,
                passing_ticks,
                hits,
                strength,
                prefix,
                trailing,
            },
            Message::Noise(noise) => RecordOutput::Noise { noise },
        }
    }
}

/// Write one record to `out` in the given format.
pub fn write_record(out: &mut impl Write, msg: &Message, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &RecordOutput::from(msg)).map_err(io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            match msg {
                Message::Passing(rec) => {
                    table
                        .set_header(vec![
                            "TRANSPONDER",
                            "TICKS",
                            "HITS",
                            "STRENGTH",
                            "PREFIX",
                            "TRAILING",
                        ])
                        .add_row(vec![
                            rec.transponder_id.to_string(),
                            rec.passing_ticks.to_string(),
                            rec.hits.to_string(),
                            rec.strength.to_string(),
                            format!("{:#06x}", rec.prefix),
                            format!("{:#04x}", rec.trailing),
                        ]);
                }
                Message::Noise(noise) => {
                    table.set_header(vec!["NOISE"]).add_row(vec![noise.to_string()]);
                }
            }
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty => match msg {
            Message::Passing(rec) => writeln!(
                out,
                "passing transponder={} ticks={} hits={} strength={} prefix={:#06x} trailing={:#04x}",
                rec.transponder_id,
                rec.passing_ticks,
                rec.hits,
                rec.strength,
                rec.prefix,
                rec.trailing
            )?,
            Message::Noise(noise) => writeln!(out, "noise level={noise}")?,
        },
    }
    out.flush()
}

/// Handler that prints every record and logs malformed lines.
///
/// The first write failure is kept and later records are dropped; the
/// caller checks [`take_error`](RecordPrinter::take_error) once serving ends.
pub struct RecordPrinter<W> {
    out: W,
    format: OutputFormat,
    printed: u64,
    failed: Option<io::Error>,
}

impl<W: Write> RecordPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            printed: 0,
            failed: None,
        }
    }

    pub fn printed(&self) -> u64 {
        self.printed
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.failed.take()
    }

    fn print(&mut self, msg: Message) {
        if self.failed.is_some() {
            return;
        }
        match write_record(&mut self.out, &msg, self.format) {
            Ok(()) => self.printed += 1,
            Err(err) => self.failed = Some(err),
        }
    }
}

impl<W: Write> Handler for RecordPrinter<W> {
    fn on_passing(&mut self, rec: Passing) {
        self.print(Message::Passing(rec));
    }

    fn on_noise(&mut self, noise: u16) {
        self.print(Message::Noise(noise));
    }

    fn on_error(&mut self, err: DecodeError) {
        warn!(error = %err, "skipping malformed line");
    }
}
