use bincode::enc::write::Writer;
use thiserror::Error;
use tracing::debug;

use crate::{
    hint_processor::hint_processor_definition::HintProcessor,
    types::{layout_name::LayoutName, program::Program},
    vm::{
        errors::cairo_run_errors::CairoRunError, runners::cairo_runner::CairoRunner,
        security::verify_secure_runner, trace::trace_entry::RelocatedTraceEntry,
    },
    Felt252,
};

/// Knobs for a full [`cairo_run`].
#[derive(Debug, Clone)]
pub struct CairoRunConfig<'a> {
    pub entrypoint: &'a str,
    pub trace_enabled: bool,
    pub relocate_mem: bool,
    pub layout: LayoutName,
    pub proof_mode: bool,
    /// Defaults to `!proof_mode` when unset.
    pub secure_run: Option<bool>,
    pub disable_trace_padding: bool,
    pub allow_missing_builtins: Option<bool>,
}

impl Default for CairoRunConfig<'_> {
    fn default() -> Self {
        CairoRunConfig {
            entrypoint: "main",
            trace_enabled: false,
            relocate_mem: false,
            layout: LayoutName::plain,
            proof_mode: false,
            secure_run: None,
            disable_trace_padding: false,
            allow_missing_builtins: None,
        }
    }
}

/// Loads, runs and relocates a compiled program.
///
/// The returned runner holds the relocated trace (if enabled) and memory
/// (if `relocate_mem` is set).
pub fn cairo_run(
    program_content: &[u8],
    cairo_run_config: &CairoRunConfig,
    hint_processor: &mut dyn HintProcessor,
) -> Result<CairoRunner, CairoRunError> {
    let program = Program::from_bytes(program_content, Some(cairo_run_config.entrypoint))?;
    cairo_run_program(&program, cairo_run_config, hint_processor)
}

pub fn cairo_run_program(
    program: &Program,
    cairo_run_config: &CairoRunConfig,
    hint_processor: &mut dyn HintProcessor,
) -> Result<CairoRunner, CairoRunError> {
    let secure_run = cairo_run_config
        .secure_run
        .unwrap_or(!cairo_run_config.proof_mode);
    let allow_missing_builtins = cairo_run_config
        .allow_missing_builtins
        .unwrap_or(cairo_run_config.proof_mode);

    let mut cairo_runner = CairoRunner::new(
        program,
        cairo_run_config.layout,
        cairo_run_config.proof_mode,
        cairo_run_config.trace_enabled,
    )?;
    cairo_runner.vm.disable_trace_padding = cairo_run_config.disable_trace_padding;

    let end = cairo_runner.initialize(allow_missing_builtins)?;
    cairo_runner.run_until_pc(end, hint_processor)?;
    cairo_runner.end_run(cairo_run_config.disable_trace_padding, false, hint_processor)?;

    cairo_runner.vm.verify_auto_deductions()?;
    cairo_runner.read_return_values(allow_missing_builtins)?;
    if cairo_run_config.proof_mode {
        cairo_runner.finalize_segments()?;
    }
    if secure_run {
        verify_secure_runner(&cairo_runner, true, None)?;
    }
    cairo_runner.relocate(cairo_run_config.relocate_mem)?;
    debug!(
        steps = cairo_runner.vm.get_current_step(),
        layout = %cairo_run_config.layout,
        proof_mode = cairo_run_config.proof_mode,
        "cairo run completed"
    );

    Ok(cairo_runner)
}

#[derive(Debug, Error)]
#[error("Failed to encode trace at position {0}, serialize error: {1}")]
pub struct EncodeTraceError(usize, bincode::error::EncodeError);

/// Writes the trace binary representation.
///
/// Each entry is three little endian `u64`s: ap, fp, pc.
pub fn write_encoded_trace(
    relocated_trace: &[RelocatedTraceEntry],
    dest: &mut impl Writer,
) -> Result<(), EncodeTraceError> {
    for (i, entry) in relocated_trace.iter().enumerate() {
        dest.write(&((entry.ap as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&((entry.fp as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&((entry.pc as u64).to_le_bytes()))
            .map_err(|e| EncodeTraceError(i, e))?;
    }

    Ok(())
}

/// Writes a binary representation of the relocated memory.
///
/// The memory pairs (address, value) are encoded and concatenated:
/// * address -> 8-byte encoded
/// * value -> 32-byte encoded
pub fn write_encoded_memory(
    relocated_memory: &[Option<Felt252>],
    dest: &mut impl Writer,
) -> Result<(), EncodeTraceError> {
    for (i, memory_cell) in relocated_memory.iter().enumerate() {
        let Some(value) = memory_cell else {
            continue;
        };
        dest.write(&(i as u64).to_le_bytes())
            .map_err(|e| EncodeTraceError(i, e))?;
        dest.write(&value.to_bytes_le())
            .map_err(|e| EncodeTraceError(i, e))?;
    }

    Ok(())
}
