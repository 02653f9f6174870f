use std::{borrow::Cow, collections::HashMap, fmt};

use bitvec::prelude as bv;
use num_traits::ToPrimitive;

use crate::{
    types::relocatable::{MaybeRelocatable, Relocatable},
    utils::from_relocatable_to_indexes,
    vm::errors::memory_errors::MemoryError,
    Felt252,
};

/// Checks a freshly written cell and returns the addresses it validated.
pub struct ValidationRule(
    #[allow(clippy::type_complexity)]
    pub  Box<dyn Fn(&Memory, Relocatable) -> Result<Vec<Relocatable>, MemoryError>>,
);

/// A stored value plus whether the run ever touched it.
#[derive(Clone, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub(crate) struct MemoryCell {
    value: MaybeRelocatable,
    accessed: bool,
}

impl MemoryCell {
    pub fn new(value: MaybeRelocatable) -> Self {
        MemoryCell {
            value,
            accessed: false,
        }
    }

    pub fn mark_accessed(&mut self) {
        self.accessed = true
    }

    pub fn is_accessed(&self) -> bool {
        self.accessed
    }

    pub fn get_value(&self) -> &MaybeRelocatable {
        &self.value
    }
}

/// Per-segment bitsets of addresses, indexed by offset.
#[derive(Default)]
pub struct AddressSet(Vec<bv::BitVec>);

impl AddressSet {
    pub(crate) fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn contains(&self, addr: &Relocatable) -> bool {
        let Some(segment) = addr.segment_index.to_usize() else {
            return false;
        };
        self.0
            .get(segment)
            .and_then(|bits| bits.get(addr.offset))
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    pub(crate) fn extend(&mut self, addresses: &[Relocatable]) {
        for addr in addresses {
            let Some(segment) = addr.segment_index.to_usize() else {
                continue;
            };
            if segment >= self.0.len() {
                self.0.resize(segment + 1, bv::BitVec::new());
            }
            let bits = &mut self.0[segment];
            if addr.offset >= bits.len() {
                bits.resize(addr.offset + 1, false);
            }
            bits.set(addr.offset, true);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.iter().map(|bits| bits.count_ones()).sum()
    }
}

/// Write-once memory split into segments.
///
/// Real segments live in `data`, temporary ones (negative indexes) in `temp_data`.
/// Temporary segments are moved into real ones by [`Memory::relocate_memory`]
/// following the rules registered with [`Memory::add_relocation_rule`].
pub struct Memory {
    pub(crate) data: Vec<Vec<Option<MemoryCell>>>,
    pub(crate) temp_data: Vec<Vec<Option<MemoryCell>>>,
    // Keys are indexes into `temp_data`: segment -1 is key 0, -2 is key 1, and so on.
    pub(crate) relocation_rules: HashMap<usize, Relocatable>,
    pub validated_addresses: AddressSet,
    validation_rules: Vec<Option<ValidationRule>>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            data: Vec::new(),
            temp_data: Vec::new(),
            relocation_rules: HashMap::new(),
            validated_addresses: AddressSet::new(),
            validation_rules: Vec::new(),
        }
    }

    /// Inserts a value into a memory address.
    ///
    /// Fails if the segment hasn't been allocated or if the cell already holds a
    /// different value. Writing the same value twice is a no-op. Cells skipped
    /// over by a non-contiguous write are left as gaps. The segment's validation
    /// rule, if any, runs after the write.
    pub fn insert<V>(&mut self, key: Relocatable, val: V) -> Result<(), MemoryError>
    where
        MaybeRelocatable: From<V>,
    {
        let val = MaybeRelocatable::from(val);
        let (segment_index, offset) = from_relocatable_to_indexes(key);

        let data = if key.segment_index.is_negative() {
            &mut self.temp_data
        } else {
            &mut self.data
        };

        let num_segments = data.len();
        let segment = data.get_mut(segment_index).ok_or_else(|| {
            MemoryError::UnallocatedSegment(Box::new((segment_index, num_segments)))
        })?;

        if segment.len() <= offset {
            segment.resize(offset + 1, None);
        }

        match &segment[offset] {
            None => segment[offset] = Some(MemoryCell::new(val)),
            Some(current) if current.get_value() != &val => {
                return Err(MemoryError::InconsistentMemory(Box::new((
                    key,
                    current.get_value().clone(),
                    val,
                ))))
            }
            Some(_) => {}
        }
        self.validate_memory_cell(key)
    }

    /// Inserts a value into memory, converting it first.
    pub fn insert_value<T: Into<MaybeRelocatable>>(
        &mut self,
        key: Relocatable,
        val: T,
    ) -> Result<(), MemoryError> {
        self.insert(key, &val.into())
    }

    /// Retrieves a value from memory (real or temporary), applying pending relocation rules.
    pub(crate) fn get<'a, 'b: 'a, K: 'a>(&'b self, key: &'a K) -> Option<Cow<'b, MaybeRelocatable>>
    where
        Relocatable: TryFrom<&'a K>,
    {
        let addr: Relocatable = key.try_into().ok()?;
        let data = if addr.segment_index.is_negative() {
            &self.temp_data
        } else {
            &self.data
        };
        let (i, j) = from_relocatable_to_indexes(addr);
        let value = data.get(i)?.get(j)?.as_ref()?.get_value();
        Some(self.apply_relocation_rules(value))
    }

    /// Like [`Memory::get`], but a missing cell is an error.
    pub fn get_value(&self, key: Relocatable) -> Result<Cow<MaybeRelocatable>, MemoryError> {
        self.get(&key)
            .ok_or_else(|| MemoryError::UnknownMemoryCell(Box::new(key)))
    }

    /// Gets the value at `key` as a Felt252.
    pub fn get_integer(&self, key: Relocatable) -> Result<Cow<Felt252>, MemoryError> {
        match self.get_value(key)? {
            Cow::Borrowed(MaybeRelocatable::Int(int)) => Ok(Cow::Borrowed(int)),
            Cow::Owned(MaybeRelocatable::Int(int)) => Ok(Cow::Owned(int)),
            _ => Err(MemoryError::ExpectedInteger(Box::new(key))),
        }
    }

    /// Gets the value at `key` as a Relocatable.
    pub fn get_relocatable(&self, key: Relocatable) -> Result<Relocatable, MemoryError> {
        match self.get_value(key)?.as_ref() {
            MaybeRelocatable::RelocatableValue(rel) => Ok(*rel),
            MaybeRelocatable::Int(_) => Err(MemoryError::ExpectedRelocatable(Box::new(key))),
        }
    }

    fn apply_relocation_rules<'a>(&self, value: &'a MaybeRelocatable) -> Cow<'a, MaybeRelocatable> {
        match value {
            MaybeRelocatable::RelocatableValue(addr) if addr.segment_index < 0 => {
                Cow::Owned(Self::relocate_address(*addr, &self.relocation_rules))
            }
            _ => Cow::Borrowed(value),
        }
    }

    fn relocate_address(
        addr: Relocatable,
        relocation_rules: &HashMap<usize, Relocatable>,
    ) -> MaybeRelocatable {
        if addr.segment_index >= 0 {
            return addr.into();
        }
        match relocation_rules.get(&(-(addr.segment_index + 1) as usize)) {
            Some(base) => Relocatable::from((base.segment_index, base.offset + addr.offset)).into(),
            None => addr.into(),
        }
    }

    /// Moves every temporary segment with a relocation rule into its destination
    /// and rewrites pointers into it. Clears the relocation rules.
    pub fn relocate_memory(&mut self) -> Result<(), MemoryError> {
        if self.relocation_rules.is_empty() || self.temp_data.is_empty() {
            return Ok(());
        }
        for segment in self.data.iter_mut().chain(self.temp_data.iter_mut()) {
            for cell in segment.iter_mut().flatten() {
                if let MaybeRelocatable::RelocatableValue(addr) = cell.value {
                    if addr.segment_index < 0 {
                        cell.value = Memory::relocate_address(addr, &self.relocation_rules);
                    }
                }
            }
        }
        for index in (0..self.temp_data.len()).rev() {
            let Some(base_addr) = self.relocation_rules.get(&index).copied() else {
                continue;
            };
            let temp_segment = self.temp_data.remove(index);
            let mut addr = base_addr;
            for cell in temp_segment {
                if let Some(cell) = cell {
                    self.insert(addr, cell.get_value())?;
                    if cell.is_accessed() {
                        self.mark_as_accessed(addr)
                    }
                }
                addr = (addr + 1)?;
            }
        }
        self.relocation_rules.clear();
        Ok(())
    }

    /// Registers that temporary segment `src_ptr` must be moved to `dst_ptr`.
    ///
    /// `src_ptr` must be the start of a temporary segment without a rule yet.
    pub(crate) fn add_relocation_rule(
        &mut self,
        src_ptr: Relocatable,
        dst_ptr: Relocatable,
    ) -> Result<(), MemoryError> {
        if src_ptr.segment_index >= 0 {
            return Err(MemoryError::AddressNotInTemporarySegment(
                src_ptr.segment_index,
            ));
        }
        if src_ptr.offset != 0 {
            return Err(MemoryError::NonZeroOffset(src_ptr.offset));
        }
        let segment_index = -(src_ptr.segment_index + 1) as usize;
        if self.relocation_rules.contains_key(&segment_index) {
            return Err(MemoryError::DuplicatedRelocation(src_ptr.segment_index));
        }
        self.relocation_rules.insert(segment_index, dst_ptr);
        Ok(())
    }

    pub fn add_validation_rule(&mut self, segment_index: usize, rule: ValidationRule) {
        if segment_index >= self.validation_rules.len() {
            self.validation_rules
                .resize_with(segment_index + 1, || None);
        }
        self.validation_rules[segment_index] = Some(rule);
    }

    fn validate_memory_cell(&mut self, addr: Relocatable) -> Result<(), MemoryError> {
        let Some(Some(rule)) = addr
            .segment_index
            .to_usize()
            .and_then(|index| self.validation_rules.get(index))
        else {
            return Ok(());
        };
        if !self.validated_addresses.contains(&addr) {
            let validated = rule.0(self, addr)?;
            self.validated_addresses.extend(&validated);
        }
        Ok(())
    }

    /// Runs every validation rule over the cells already written to its segment.
    pub fn validate_existing_memory(&mut self) -> Result<(), MemoryError> {
        for (index, rule) in self.validation_rules.iter().enumerate() {
            let (Some(rule), Some(segment)) = (rule, self.data.get(index)) else {
                continue;
            };
            for offset in 0..segment.len() {
                let addr = Relocatable::from((index as isize, offset));
                if segment[offset].is_some() && !self.validated_addresses.contains(&addr) {
                    let validated = rule.0(self, addr)?;
                    self.validated_addresses.extend(&validated);
                }
            }
        }
        Ok(())
    }

    /// Values from `addr` to `addr + size`, with `None` for gaps.
    pub fn get_range(&self, addr: Relocatable, size: usize) -> Vec<Option<Cow<MaybeRelocatable>>> {
        (0..size)
            .map(|i| (addr + i).ok().and_then(|x| self.get(&x)))
            .collect()
    }

    /// Values from `addr` to `addr + size`. A gap is an error.
    pub fn get_continuous_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        let mut values = Vec::with_capacity(size);
        for i in 0..size {
            match self.get(&(addr + i)?) {
                Some(elem) => values.push(elem.into_owned()),
                None => return Err(MemoryError::GetRangeMemoryGap(Box::new((addr, size)))),
            }
        }
        Ok(values)
    }

    /// Felt values from `addr` to `addr + size`. Gaps and relocatables are errors.
    pub fn get_integer_range(
        &self,
        addr: Relocatable,
        size: usize,
    ) -> Result<Vec<Cow<Felt252>>, MemoryError> {
        (0..size)
            .map(|i| self.get_integer((addr + i)?))
            .collect()
    }

    pub fn mark_as_accessed(&mut self, addr: Relocatable) {
        let (i, j) = from_relocatable_to_indexes(addr);
        let data = if addr.segment_index < 0 {
            &mut self.temp_data
        } else {
            &mut self.data
        };
        if let Some(Some(cell)) = data.get_mut(i).and_then(|segment| segment.get_mut(j)) {
            cell.mark_accessed()
        }
    }

    pub fn get_amount_of_accessed_addresses_for_segment(
        &self,
        segment_index: usize,
    ) -> Option<usize> {
        let segment = self.data.get(segment_index)?;
        Some(
            segment
                .iter()
                .flatten()
                .filter(|cell| cell.is_accessed())
                .count(),
        )
    }

    /// Every written address, temporary segments first.
    pub(crate) fn iter_addresses(&self) -> impl Iterator<Item = Relocatable> + '_ {
        let temp = self.temp_data.iter().enumerate().flat_map(|(i, segment)| {
            segment.iter().enumerate().filter_map(move |(j, cell)| {
                cell.as_ref()
                    .map(|_| Relocatable::from((-(i as isize) - 1, j)))
            })
        });
        let real = self.data.iter().enumerate().flat_map(|(i, segment)| {
            segment.iter().enumerate().filter_map(move |(j, cell)| {
                cell.as_ref().map(|_| Relocatable::from((i as isize, j)))
            })
        });
        temp.chain(real)
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for addr in self.iter_addresses() {
            if let Some(value) = self.get(&addr) {
                writeln!(f, "({},{}) : {}", addr.segment_index, addr.offset, value)?;
            }
        }
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
