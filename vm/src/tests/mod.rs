use crate::{
    cairo_run::{cairo_run, CairoRunConfig},
    hint_processor::builtin_hint_processor::builtin_hint_processor_definition::BuiltinHintProcessor,
    types::layout_name::LayoutName,
    vm::runners::cairo_runner::CairoRunner,
};

mod cairo_run_test;

// Runs a program that should succeed, with trace and memory relocation on.
// Checks the number of memory holes when given.
fn run_program(data: &[u8], layout: LayoutName, memory_holes: Option<usize>) -> CairoRunner {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let cairo_run_config = CairoRunConfig {
        layout,
        relocate_mem: true,
        trace_enabled: true,
        ..Default::default()
    };
    let runner = cairo_run(data, &cairo_run_config, &mut hint_processor).expect("Execution failed");
    if let Some(holes) = memory_holes {
        assert_eq!(runner.get_memory_holes().unwrap(), holes);
    }
    runner
}

// For simple programs that should just succeed and leave no memory holes.
fn run_program_simple(data: &[u8]) -> CairoRunner {
    run_program(data, LayoutName::all_cairo, Some(0))
}

fn run_program_with_error(data: &[u8], error: &str) {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let cairo_run_config = CairoRunConfig {
        layout: LayoutName::all_cairo,
        ..Default::default()
    };
    let err = cairo_run(data, &cairo_run_config, &mut hint_processor)
        .err()
        .expect("Execution should fail");
    assert!(
        err.to_string().contains(error),
        "unexpected error message: {err}"
    );
}
