use std::{cell::RefCell, collections::HashMap, rc::Rc};

use num_bigint::BigInt;

use crate::{
    hint_processor::builtin_hint_processor::dict_manager::DictManager,
    vm::errors::{exec_scope_errors::ExecScopeError, hint_errors::HintError},
    Felt252,
};

/// A value a hint can keep in an execution scope.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeValue {
    Felt(Felt252),
    BigInt(BigInt),
    Int(usize),
    IntList(Vec<usize>),
    DictManager(Rc<RefCell<DictManager>>),
}

impl From<Felt252> for ScopeValue {
    fn from(value: Felt252) -> Self {
        ScopeValue::Felt(value)
    }
}

impl From<BigInt> for ScopeValue {
    fn from(value: BigInt) -> Self {
        ScopeValue::BigInt(value)
    }
}

impl From<usize> for ScopeValue {
    fn from(value: usize) -> Self {
        ScopeValue::Int(value)
    }
}

impl From<Vec<usize>> for ScopeValue {
    fn from(value: Vec<usize>) -> Self {
        ScopeValue::IntList(value)
    }
}

impl From<Rc<RefCell<DictManager>>> for ScopeValue {
    fn from(value: Rc<RefCell<DictManager>>) -> Self {
        ScopeValue::DictManager(value)
    }
}

impl From<DictManager> for ScopeValue {
    fn from(value: DictManager) -> Self {
        ScopeValue::DictManager(Rc::new(RefCell::new(value)))
    }
}

/// Stack of variable scopes shared by the hints of a run.
///
/// The bottom scope is the main scope and can't be exited.
#[derive(Debug)]
pub struct ExecutionScopes {
    pub data: Vec<HashMap<String, ScopeValue>>,
}

impl ExecutionScopes {
    pub fn new() -> ExecutionScopes {
        ExecutionScopes {
            data: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self, new_scope_locals: HashMap<String, ScopeValue>) {
        self.data.push(new_scope_locals);
    }

    pub fn exit_scope(&mut self) -> Result<(), ExecScopeError> {
        if self.data.len() == 1 {
            return Err(ExecScopeError::ExitMainScopeError);
        }
        self.data.pop();
        Ok(())
    }

    pub fn get_local_variables(&self) -> Result<&HashMap<String, ScopeValue>, HintError> {
        self.data
            .last()
            .ok_or(HintError::FromScopeError(ExecScopeError::NoScopeError))
    }

    pub fn get_local_variables_mut(
        &mut self,
    ) -> Result<&mut HashMap<String, ScopeValue>, HintError> {
        self.data
            .last_mut()
            .ok_or(HintError::FromScopeError(ExecScopeError::NoScopeError))
    }

    pub fn delete_variable(&mut self, var_name: &str) {
        if let Ok(local_variables) = self.get_local_variables_mut() {
            local_variables.remove(var_name);
        }
    }

    pub fn assign_or_update_variable(&mut self, var_name: &str, var_value: ScopeValue) {
        if let Ok(local_variables) = self.get_local_variables_mut() {
            local_variables.insert(var_name.to_string(), var_value);
        }
    }

    fn lookup(&self, name: &str) -> Result<&ScopeValue, HintError> {
        self.get_local_variables()?
            .get(name)
            .ok_or_else(|| not_in_scope(name))
    }

    pub fn get_felt(&self, name: &str) -> Result<Felt252, HintError> {
        match self.lookup(name)? {
            ScopeValue::Felt(value) => Ok(*value),
            _ => Err(not_in_scope(name)),
        }
    }

    pub fn get_bigint(&self, name: &str) -> Result<BigInt, HintError> {
        match self.lookup(name)? {
            ScopeValue::BigInt(value) => Ok(value.clone()),
            _ => Err(not_in_scope(name)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<usize, HintError> {
        match self.lookup(name)? {
            ScopeValue::Int(value) => Ok(*value),
            _ => Err(not_in_scope(name)),
        }
    }

    pub fn get_int_list(&self, name: &str) -> Result<&Vec<usize>, HintError> {
        match self.lookup(name)? {
            ScopeValue::IntList(value) => Ok(value),
            _ => Err(not_in_scope(name)),
        }
    }

    pub fn get_mut_int_list(&mut self, name: &str) -> Result<&mut Vec<usize>, HintError> {
        match self.get_local_variables_mut()?.get_mut(name) {
            Some(ScopeValue::IntList(value)) => Ok(value),
            _ => Err(not_in_scope(name)),
        }
    }

    /// The dictionary manager of the current scope, stored under `dict_manager`.
    pub fn get_dict_manager(&self) -> Result<Rc<RefCell<DictManager>>, HintError> {
        match self.lookup("dict_manager")? {
            ScopeValue::DictManager(manager) => Ok(Rc::clone(manager)),
            _ => Err(not_in_scope("dict_manager")),
        }
    }
}

fn not_in_scope(name: &str) -> HintError {
    HintError::VariableNotInScopeError(name.into())
}

impl Default for ExecutionScopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn initialize_execution_scopes() {
        let scopes = ExecutionScopes::new();
        assert_eq!(scopes.data.len(), 1);
        assert!(scopes.data[0].is_empty());
    }

    #[test]
    fn enter_and_exit_scope() {
        let mut scopes = ExecutionScopes::new();
        scopes.assign_or_update_variable("a", Felt252::from(2).into());
        scopes.enter_scope(HashMap::from([("n".to_string(), ScopeValue::Int(3))]));
        assert_eq!(scopes.get_int("n").unwrap(), 3);
        assert_matches!(scopes.get_felt("a"), Err(HintError::VariableNotInScopeError(_)));

        scopes.exit_scope().unwrap();
        assert_eq!(scopes.get_felt("a").unwrap(), Felt252::from(2));
        assert_matches!(scopes.get_int("n"), Err(HintError::VariableNotInScopeError(_)));
    }

    #[test]
    fn exit_main_scope() {
        let mut scopes = ExecutionScopes::new();
        assert_eq!(scopes.exit_scope(), Err(ExecScopeError::ExitMainScopeError));
    }

    #[test]
    fn update_and_delete_variable() {
        let mut scopes = ExecutionScopes::new();
        scopes.assign_or_update_variable("n", ScopeValue::Felt(Felt252::from(5)));
        scopes.assign_or_update_variable("n", ScopeValue::Felt(Felt252::from(4)));
        assert_eq!(scopes.get_felt("n").unwrap(), Felt252::from(4));
        scopes.delete_variable("n");
        assert_matches!(scopes.get_felt("n"), Err(HintError::VariableNotInScopeError(name)) if &*name == "n");
    }

    #[test]
    fn getters_check_variant() {
        let mut scopes = ExecutionScopes::new();
        scopes.assign_or_update_variable("list", vec![1usize, 2].into());
        scopes.assign_or_update_variable("big", BigInt::from(-7).into());
        assert_eq!(scopes.get_int_list("list").unwrap(), &vec![1, 2]);
        scopes.get_mut_int_list("list").unwrap().push(3);
        assert_eq!(scopes.get_int_list("list").unwrap(), &vec![1, 2, 3]);
        assert_eq!(scopes.get_bigint("big").unwrap(), BigInt::from(-7));
        assert_matches!(scopes.get_felt("list"), Err(HintError::VariableNotInScopeError(_)));
        assert_matches!(scopes.get_int("big"), Err(HintError::VariableNotInScopeError(_)));
    }

    #[test]
    fn dict_manager_is_shared() {
        let mut scopes = ExecutionScopes::new();
        scopes.assign_or_update_variable("dict_manager", DictManager::new().into());
        let first = scopes.get_dict_manager().unwrap();
        let second = scopes.get_dict_manager().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_dict_manager() {
        let scopes = ExecutionScopes::new();
        assert_matches!(
            scopes.get_dict_manager(),
            Err(HintError::VariableNotInScopeError(name)) if &*name == "dict_manager"
        );
    }
}
