use std::io;

use tracing::info;
use tranx2_client::Client;

use crate::cmd::ListenArgs;
use crate::exit::{client_error, io_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, RecordPrinter};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let printer = RecordPrinter::new(io::stdout().lock(), format);
    let mut client = Client::new(&args.port, printer);
    client.options_mut().baud_rate = args.baud;
    client.options_mut().minimum_read_size = args.min_read;

    client
        .listen()
        .map_err(|err| client_error("open failed", err))?;

    let err = client.serve();
    client.close();

    let printer = client.handler_mut();
    if let Some(err) = printer.take_error() {
        return Err(io_error("write failed", err));
    }

    if err.is_end_of_stream() {
        info!(records = printer.printed(), "decoder stream ended");
        Ok(SUCCESS)
    } else {
        Err(client_error("read failed", err))
    }
}
