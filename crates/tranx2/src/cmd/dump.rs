use std::fs::File;
use std::io::{self, Read};

use tracing::debug;
use tranx2_client::Client;
use tranx2_codec::LineConfig;

use crate::cmd::DumpArgs;
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, RecordPrinter};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let source: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).map_err(|err| io_error(&format!("open {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let printer = RecordPrinter::new(io::stdout().lock(), format);
    let mut client = Client::from_stream(source, printer).with_line_config(LineConfig {
        max_line_length: args.max_line_length,
    });

    let err = client.serve();
    let printer = client.handler_mut();
    if let Some(err) = printer.take_error() {
        return Err(io_error("write failed", err));
    }
    debug!(records = printer.printed(), "dump finished");

    if err.is_end_of_stream() {
        Ok(SUCCESS)
    } else {
        Err(client_error("read failed", err))
    }
}
