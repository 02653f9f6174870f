//! Source text of the hints [`BuiltinHintProcessor`](super::builtin_hint_processor_definition::BuiltinHintProcessor)
//! runs natively. A hint is matched by its exact code, whitespace included.

use indoc::indoc;

pub const ADD_SEGMENT: &str = indoc! {r#"memory[ap] = segments.add()"#};

pub const VM_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope()"#};

pub const VM_EXIT_SCOPE: &str = indoc! {r#"vm_exit_scope()"#};

pub const MEMCPY_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope({'n': ids.len})"#};

pub const MEMCPY_CONTINUE_COPYING: &str = indoc! {r#"n -= 1
ids.continue_copying = 1 if n > 0 else 0"#};

pub const MEMSET_ENTER_SCOPE: &str = indoc! {r#"vm_enter_scope({'n': ids.n})"#};

pub const MEMSET_CONTINUE_LOOP: &str = indoc! {r#"n -= 1
ids.continue_loop = 1 if n > 0 else 0"#};

pub const IS_NN: &str =
    indoc! {r#"memory[ap] = 0 if 0 <= (ids.a % PRIME) < range_check_builtin.bound else 1"#};

pub const ASSERT_NN: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.a)
assert 0 <= ids.a % PRIME < range_check_builtin.bound, f'a = {ids.a} is out of range.'"#};

pub const ASSERT_NOT_ZERO: &str = indoc! {r#"from starkware.cairo.common.math_utils import assert_integer
assert_integer(ids.value)
assert ids.value % PRIME != 0, f'assert_not_zero failed: {ids.value} = 0.'"#};

pub const ASSERT_NOT_EQUAL: &str = indoc! {r#"from starkware.cairo.lang.vm.relocatable import RelocatableValue
both_ints = isinstance(ids.a, int) and isinstance(ids.b, int)
both_relocatable = (
    isinstance(ids.a, RelocatableValue) and isinstance(ids.b, RelocatableValue) and
    ids.a.segment_index == ids.b.segment_index)
assert both_ints or both_relocatable, \
    f'assert_not_equal failed: non-comparable values: {ids.a}, {ids.b}.'
assert (ids.a - ids.b) % PRIME != 0, f'assert_not_equal failed: {ids.a} = {ids.b}.'"#};

pub const DEFAULT_DICT_NEW: &str = indoc! {r#"if '__dict_manager' not in globals():
    from starkware.cairo.common.dict import DictManager
    __dict_manager = DictManager()

memory[ap] = __dict_manager.new_default_dict(segments, ids.default_value)"#};

pub const DICT_READ: &str = indoc! {r#"dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
dict_tracker.current_ptr += ids.DictAccess.SIZE
ids.value = dict_tracker.data[ids.key]"#};

pub const DICT_WRITE: &str = indoc! {r#"dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
dict_tracker.current_ptr += ids.DictAccess.SIZE
ids.dict_ptr.prev_value = dict_tracker.data[ids.key]
dict_tracker.data[ids.key] = ids.new_value"#};

pub const VERIFY_ECDSA_SIGNATURE: &str = indoc! {r#"ecdsa_builtin.add_signature(ids.ecdsa_ptr.address_, (ids.signature_r, ids.signature_s))"#};

pub const RELOCATE_SEGMENT: &str =
    indoc! {r#"memory.add_relocation_rule(src_ptr=ids.src_ptr, dest_ptr=ids.dest_ptr)"#};

pub const TEMPORARY_ARRAY: &str = indoc! {r#"ids.temporary_array = segments.add_temp_segment()"#};
