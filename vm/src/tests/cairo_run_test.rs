use assert_matches::assert_matches;

use crate::{
    hint_processor::builtin_hint_processor::hint_code,
    relocatable,
    tests::*,
    vm::{
        errors::{
            cairo_run_errors::CairoRunError, hint_errors::HintError, runner_errors::RunnerError,
            vm_errors::VirtualMachineError,
        },
        trace::trace_entry::RelocatedTraceEntry,
    },
    Felt252,
};

const FIBONACCI: &[u8] = include_bytes!("../../../cairo_programs/fibonacci.json");

#[test]
fn fibonacci() {
    let runner = run_program_simple(FIBONACCI);
    assert_eq!(runner.vm.get_current_step(), 80);

    let trace = runner.relocated_trace.as_ref().unwrap();
    assert_eq!(trace[0], RelocatedTraceEntry { pc: 1, ap: 27, fp: 27 });
    assert_eq!(trace.len(), 80);
}

#[test]
fn fibonacci_runner_keeps_program() {
    let runner = run_program_simple(FIBONACCI);
    let program = runner.get_program();
    assert_eq!(program.builtins_len(), 0);
    assert!(program.get_identifier("__main__.main").is_some());
}

#[test]
fn fibonacci_result_in_relocated_memory() {
    let runner = run_program_simple(FIBONACCI);
    let result = runner.vm.get_return_values(1).unwrap();
    assert_eq!(result, vec![Felt252::from(144).into()]);
    assert!(runner
        .relocated_memory
        .iter()
        .flatten()
        .any(|value| *value == Felt252::from(144)));
}

#[test]
fn fibonacci_on_every_layout() {
    for layout in [
        LayoutName::plain,
        LayoutName::small,
        LayoutName::dex,
        LayoutName::recursive,
        LayoutName::starknet,
        LayoutName::all_cairo,
        LayoutName::dynamic,
    ] {
        let runner = run_program(FIBONACCI, layout, None);
        assert_eq!(runner.vm.get_current_step(), 80, "{layout}");
    }
}

#[test]
fn output_42() {
    let mut runner = run_program_simple(include_bytes!("../../../cairo_programs/output_42.json"));
    let mut output = String::new();
    runner.vm.write_output(&mut output).unwrap();
    assert_eq!(output, "42\n");
}

#[test]
fn bitwise_output() {
    let mut runner = run_program(
        include_bytes!("../../../cairo_programs/bitwise_output.json"),
        LayoutName::all_cairo,
        None,
    );
    let mut output = String::new();
    runner.vm.write_output(&mut output).unwrap();
    assert_eq!(output, "8\n");

    let resources = runner.get_execution_resources().unwrap();
    assert_eq!(resources.n_steps, 9);
}

#[test]
fn segments_add_hint() {
    let runner = run_program_simple(include_bytes!("../../../cairo_programs/segments_add.json"));
    // main's frame starts after [return_fp, end]; the hint stored the new
    // segment's base in its first cell.
    let new_segment = runner.vm.get_relocatable(relocatable!(1, 2)).unwrap();
    assert_eq!(
        runner.vm.get_integer(new_segment).unwrap().into_owned(),
        Felt252::from(7)
    );
}

#[test]
fn assert_nn_hint() {
    let runner = run_program_simple(include_bytes!("../../../cairo_programs/assert_nn.json"));
    assert_eq!(runner.vm.get_current_step(), 3);
}

#[test]
fn assert_nn_hint_out_of_range() {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let config = CairoRunConfig {
        layout: LayoutName::small,
        ..Default::default()
    };
    assert_matches!(
        cairo_run(
            include_bytes!("../../../cairo_programs/assert_nn_out_of_range.json"),
            &config,
            &mut hint_processor
        ).err(),
        Some(CairoRunError::VirtualMachine(VirtualMachineError::Hint(bx)))
            if matches!(*bx, (pc, 0, _, HintError::AssertNNValueOutOfRange(_)) if pc == relocatable!(0, 2))
    );
}

#[test]
fn assert_nn_hint_error_message() {
    run_program_with_error(
        include_bytes!("../../../cairo_programs/assert_nn_out_of_range.json"),
        "is out of range",
    );
}

#[test]
fn hint_error_message_names_pc_and_code() {
    run_program_with_error(
        include_bytes!("../../../cairo_programs/assert_nn_out_of_range.json"),
        "hint #0 at pc 0:2",
    );
    run_program_with_error(
        include_bytes!("../../../cairo_programs/assert_nn_out_of_range.json"),
        hint_code::ASSERT_NN,
    );
}

#[test]
fn proof_mode_requires_start_label() {
    let mut hint_processor = BuiltinHintProcessor::new_empty();
    let config = CairoRunConfig {
        layout: LayoutName::small,
        proof_mode: true,
        ..Default::default()
    };
    assert_matches!(
        cairo_run(FIBONACCI, &config, &mut hint_processor).err(),
        Some(CairoRunError::Runner(RunnerError::NoProgramStart))
    );
}
