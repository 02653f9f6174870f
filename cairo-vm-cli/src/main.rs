#![deny(warnings)]
#![forbid(unsafe_code)]
use bincode::enc::write::Writer;
use cairo_vm_core::cairo_run::{self, EncodeTraceError};
use cairo_vm_core::hint_processor::builtin_hint_processor::builtin_hint_processor_definition::BuiltinHintProcessor;
use cairo_vm_core::types::layout_name::LayoutName;
use cairo_vm_core::vm::errors::cairo_run_errors::CairoRunError;
use cairo_vm_core::vm::errors::trace_errors::TraceError;
use cairo_vm_core::vm::errors::vm_errors::VirtualMachineError;
use clap::{Parser, ValueHint};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(value_parser, value_hint=ValueHint::FilePath)]
    filename: PathBuf,
    #[clap(long = "trace_file", value_parser)]
    trace_file: Option<PathBuf>,
    #[clap(long = "print_output")]
    print_output: bool,
    #[clap(long = "entrypoint", default_value = "main")]
    entrypoint: String,
    #[clap(long = "memory_file")]
    memory_file: Option<PathBuf>,
    #[clap(long = "layout", default_value = "plain", value_enum)]
    layout: LayoutName,
    #[clap(long = "proof_mode")]
    proof_mode: bool,
    #[clap(long = "secure_run", num_args = 0..=1, default_missing_value = "true")]
    secure_run: Option<bool>,
    #[clap(long = "disable_trace_padding")]
    disable_trace_padding: bool,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Invalid arguments")]
    Cli(#[from] clap::Error),
    #[error("Failed to interact with the file system")]
    IO(#[from] std::io::Error),
    #[error("The cairo program execution failed: {0}")]
    Runner(#[from] CairoRunError),
    #[error(transparent)]
    EncodeTrace(#[from] EncodeTraceError),
    #[error(transparent)]
    VirtualMachine(#[from] VirtualMachineError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Buffered file sink for the bincode trace and memory encoders.
struct FileWriter {
    buf_writer: io::BufWriter<std::fs::File>,
    bytes_written: usize,
}

impl Writer for FileWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), bincode::error::EncodeError> {
        self.buf_writer
            .write_all(bytes)
            .map_err(|e| bincode::error::EncodeError::Io {
                inner: e,
                index: self.bytes_written,
            })?;

        self.bytes_written += bytes.len();

        Ok(())
    }
}

impl FileWriter {
    fn create(path: &Path, capacity: usize) -> io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            buf_writer: io::BufWriter::with_capacity(capacity, file),
            bytes_written: 0,
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.buf_writer.flush()
    }
}

fn run(args: impl Iterator<Item = String>) -> Result<(), Error> {
    let args = Args::try_parse_from(args)?;
    debug!(?args, "parsed arguments");

    let cairo_run_config = cairo_run::CairoRunConfig {
        entrypoint: &args.entrypoint,
        trace_enabled: args.trace_file.is_some(),
        relocate_mem: args.memory_file.is_some(),
        layout: args.layout,
        proof_mode: args.proof_mode,
        secure_run: args.secure_run,
        disable_trace_padding: args.disable_trace_padding,
        ..Default::default()
    };

    let program_content = std::fs::read(&args.filename)?;
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let mut cairo_runner =
        cairo_run::cairo_run(&program_content, &cairo_run_config, &mut hint_processor)?;

    if args.print_output {
        let mut output_buffer = "Program Output:\n".to_string();
        cairo_runner.vm.write_output(&mut output_buffer)?;
        print!("{output_buffer}");
    }

    if let Some(ref trace_path) = args.trace_file {
        let relocated_trace = cairo_runner
            .relocated_trace
            .as_ref()
            .ok_or(Error::Trace(TraceError::TraceNotRelocated))?;

        let mut trace_writer = FileWriter::create(trace_path, 3 * 1024 * 1024)?;
        cairo_run::write_encoded_trace(relocated_trace, &mut trace_writer)?;
        trace_writer.flush()?;
        info!(path = %trace_path.display(), entries = relocated_trace.len(), "trace written");
    }

    if let Some(ref memory_path) = args.memory_file {
        let mut memory_writer = FileWriter::create(memory_path, 5 * 1024 * 1024)?;
        cairo_run::write_encoded_memory(&cairo_runner.relocated_memory, &mut memory_writer)?;
        memory_writer.flush()?;
        info!(path = %memory_path.display(), "memory written");
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(std::env::args()) {
        Ok(()) => {}
        Err(Error::Cli(err)) => err.exit(),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
