use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    hint_processor::{
        builtin_hint_processor::{
            dict_manager::DictManager,
            hint_utils::{
                get_maybe_relocatable_from_var_name, get_ptr_from_var_name,
                insert_value_from_var_name, insert_value_into_ap,
            },
        },
        hint_processor_definition::HintReference,
    },
    serde::deserialize_program::ApTracking,
    types::exec_scope::{ExecutionScopes, ScopeValue},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

//DictAccess struct has three members, so the size of DictAccess* is 3
pub const DICT_ACCESS_SIZE: usize = 3;

/*Implements hint:
   if '__dict_manager' not in globals():
            from starkware.cairo.common.dict import DictManager
            __dict_manager = DictManager()

        memory[ap] = __dict_manager.new_default_dict(segments, ids.default_value)
*/
pub fn default_dict_new(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let default_value =
        get_maybe_relocatable_from_var_name("default_value", vm, ids_data, ap_tracking)?;
    //Check if there is a dict manager in scope, create it if there isnt one
    let base = if let Ok(dict_manager) = exec_scopes.get_dict_manager() {
        dict_manager
            .borrow_mut()
            .new_default_dict(vm, &default_value)?
    } else {
        let mut dict_manager = DictManager::new();
        let base = dict_manager.new_default_dict(vm, &default_value)?;
        exec_scopes.assign_or_update_variable(
            "dict_manager",
            ScopeValue::DictManager(Rc::new(RefCell::new(dict_manager))),
        );
        base
    };
    insert_value_into_ap(vm, base)
}

/* Implements hint:
   dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
   dict_tracker.current_ptr += ids.DictAccess.SIZE
   ids.value = dict_tracker.data[ids.key]
*/
pub fn dict_read(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = get_maybe_relocatable_from_var_name("key", vm, ids_data, ap_tracking)?;
    let dict_ptr = get_ptr_from_var_name("dict_ptr", vm, ids_data, ap_tracking)?;
    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let mut dict = dict_manager_ref.borrow_mut();
    let tracker = dict.get_tracker_mut(dict_ptr)?;
    tracker.current_ptr.offset += DICT_ACCESS_SIZE;
    let value = tracker.get_value(&key)?.clone();
    insert_value_from_var_name("value", value, vm, ids_data, ap_tracking)
}

/* Implements hint:
    dict_tracker = __dict_manager.get_tracker(ids.dict_ptr)
    dict_tracker.current_ptr += ids.DictAccess.SIZE
    ids.dict_ptr.prev_value = dict_tracker.data[ids.key]
    dict_tracker.data[ids.key] = ids.new_value
*/
pub fn dict_write(
    vm: &mut VirtualMachine,
    exec_scopes: &mut ExecutionScopes,
    ids_data: &HashMap<String, HintReference>,
    ap_tracking: &ApTracking,
) -> Result<(), HintError> {
    let key = get_maybe_relocatable_from_var_name("key", vm, ids_data, ap_tracking)?;
    let new_value = get_maybe_relocatable_from_var_name("new_value", vm, ids_data, ap_tracking)?;
    let dict_ptr = get_ptr_from_var_name("dict_ptr", vm, ids_data, ap_tracking)?;
    let dict_manager_ref = exec_scopes.get_dict_manager()?;
    let mut dict = dict_manager_ref.borrow_mut();
    let tracker = dict.get_tracker_mut(dict_ptr)?;
    //dict_ptr points to a (key, prev_value, new_value) struct
    let dict_ptr_prev_value = (dict_ptr + 1_usize)?;
    tracker.current_ptr.offset += DICT_ACCESS_SIZE;
    let prev_value = tracker.get_value(&key)?.clone();
    tracker.insert_value(&key, &new_value);
    vm.insert_value(dict_ptr_prev_value, prev_value)?;
    Ok(())
}
