use std::collections::HashMap;

use crate::{
    types::relocatable::{MaybeRelocatable, Relocatable},
    vm::{errors::hint_errors::HintError, vm_core::VirtualMachine},
};

///Manages dictionaries in a Cairo program.
///Each Cairo dict lives in its own segment, so trackers are keyed by segment index.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct DictManager {
    pub trackers: HashMap<isize, DictTracker>,
}

///Tracks the host side contents of a Cairo dict.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DictTracker {
    pub data: HashMap<MaybeRelocatable, MaybeRelocatable>,
    //Value handed out for keys that were never written.
    pub default_value: Option<MaybeRelocatable>,
    //Pointer to the first unused position in the dict segment.
    pub current_ptr: Relocatable,
}

impl DictManager {
    pub fn new() -> Self {
        DictManager {
            trackers: HashMap::new(),
        }
    }

    //Creates a new Cairo default dictionary on a fresh segment and returns its base
    pub fn new_default_dict(
        &mut self,
        vm: &mut VirtualMachine,
        default_value: &MaybeRelocatable,
    ) -> Result<Relocatable, HintError> {
        let base = vm.add_memory_segment();
        if self.trackers.contains_key(&base.segment_index) {
            return Err(HintError::CantCreateDictionaryOnTakenSegment(
                base.segment_index,
            ));
        }
        self.trackers.insert(
            base.segment_index,
            DictTracker::new_default_dict(base, default_value),
        );
        Ok(base)
    }

    //Returns the tracker whose current_ptr matches the given dict_ptr
    pub fn get_tracker_mut(
        &mut self,
        dict_ptr: Relocatable,
    ) -> Result<&mut DictTracker, HintError> {
        let tracker = self
            .trackers
            .get_mut(&dict_ptr.segment_index)
            .ok_or(HintError::NoDictTracker(dict_ptr.segment_index))?;
        if tracker.current_ptr != dict_ptr {
            return Err(HintError::MismatchedDictPtr(Box::new((
                tracker.current_ptr,
                dict_ptr,
            ))));
        }
        Ok(tracker)
    }
}

impl DictTracker {
    pub fn new_empty(base: Relocatable) -> Self {
        DictTracker {
            data: HashMap::new(),
            default_value: None,
            current_ptr: base,
        }
    }

    pub fn new_default_dict(base: Relocatable, default_value: &MaybeRelocatable) -> Self {
        DictTracker {
            data: HashMap::new(),
            default_value: Some(default_value.clone()),
            current_ptr: base,
        }
    }

    /// Value stored under `key`. A default dict records the default value for
    /// a missing key before returning it.
    pub fn get_value(&mut self, key: &MaybeRelocatable) -> Result<&MaybeRelocatable, HintError> {
        match &self.default_value {
            Some(default_value) => Ok(self
                .data
                .entry(key.clone())
                .or_insert_with(|| default_value.clone())),
            None => self
                .data
                .get(key)
                .ok_or_else(|| HintError::NoValueForKey(Box::new(key.clone()))),
        }
    }

    pub fn insert_value(&mut self, key: &MaybeRelocatable, val: &MaybeRelocatable) {
        self.data.insert(key.clone(), val.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{relocatable, utils::test_utils::*};
    use assert_matches::assert_matches;

    #[test]
    fn create_dict_manager() {
        let dict_manager = DictManager::new();
        assert_eq!(dict_manager.trackers, HashMap::new());
    }

    #[test]
    fn new_default_dict_takes_a_fresh_segment() {
        let mut vm = vm!();
        add_segments!(vm, 2);
        let mut dict_manager = DictManager::new();

        let base = dict_manager
            .new_default_dict(&mut vm, &MaybeRelocatable::from(6_usize))
            .unwrap();
        assert_eq!(base, relocatable!(2, 0));
        assert_eq!(
            dict_manager.trackers.get(&2),
            Some(&DictTracker::new_default_dict(
                relocatable!(2, 0),
                &MaybeRelocatable::from(6_usize)
            ))
        );
    }

    #[test]
    fn new_default_dict_on_taken_segment() {
        let mut vm = vm!();
        let mut dict_manager = DictManager::new();
        dict_manager
            .trackers
            .insert(0, DictTracker::new_empty(relocatable!(0, 0)));

        assert_matches!(
            dict_manager.new_default_dict(&mut vm, &MaybeRelocatable::from(6_usize)),
            Err(HintError::CantCreateDictionaryOnTakenSegment(0))
        );
    }

    #[test]
    fn get_tracker_checks_current_ptr() {
        let mut dict_manager = DictManager::new();
        dict_manager
            .trackers
            .insert(1, DictTracker::new_empty(relocatable!(1, 3)));

        assert!(dict_manager.get_tracker_mut(relocatable!(1, 3)).is_ok());
        assert_matches!(
            dict_manager.get_tracker_mut(relocatable!(1, 0)),
            Err(HintError::MismatchedDictPtr(bx)) if *bx == (relocatable!(1, 3), relocatable!(1, 0))
        );
        assert_matches!(
            dict_manager.get_tracker_mut(relocatable!(4, 0)),
            Err(HintError::NoDictTracker(4))
        );
    }

    #[test]
    fn default_dict_remembers_default_reads() {
        let mut tracker =
            DictTracker::new_default_dict(relocatable!(1, 0), &MaybeRelocatable::from(2_usize));
        let key = MaybeRelocatable::from(5_usize);

        assert_eq!(tracker.get_value(&key).unwrap(), &MaybeRelocatable::from(2_usize));
        assert_eq!(tracker.data.get(&key), Some(&MaybeRelocatable::from(2_usize)));

        tracker.insert_value(&key, &MaybeRelocatable::from(9_usize));
        assert_eq!(tracker.get_value(&key).unwrap(), &MaybeRelocatable::from(9_usize));
    }

    #[test]
    fn plain_dict_missing_key() {
        let mut tracker = DictTracker::new_empty(relocatable!(1, 0));
        assert_matches!(
            tracker.get_value(&MaybeRelocatable::from(5_usize)),
            Err(HintError::NoValueForKey(bx)) if *bx == MaybeRelocatable::from(5_usize)
        );
    }
}
