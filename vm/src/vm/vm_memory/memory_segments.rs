use std::{any::Any, collections::HashMap, fmt};

use crate::{
    types::relocatable::{relocate_value, MaybeRelocatable, Relocatable},
    vm::{errors::memory_errors::MemoryError, vm_memory::memory::Memory},
    Felt252,
};

pub struct MemorySegmentManager {
    /// Finalized sizes, which may exceed the used size due to padding.
    pub segment_sizes: HashMap<usize, usize>,
    pub segment_used_sizes: Option<Vec<usize>>,
    pub(crate) memory: Memory,
    // Segment index to (offset, page_id) pairs making up its public memory.
    // Offsets are relative to the segment start.
    pub public_memory_offsets: HashMap<usize, Vec<(usize, usize)>>,
}

impl MemorySegmentManager {
    pub fn new() -> MemorySegmentManager {
        MemorySegmentManager {
            segment_sizes: HashMap::new(),
            segment_used_sizes: None,
            memory: Memory::new(),
            public_memory_offsets: HashMap::new(),
        }
    }

    pub fn num_segments(&self) -> usize {
        self.memory.data.len()
    }

    pub fn num_temp_segments(&self) -> usize {
        self.memory.temp_data.len()
    }

    /// Allocates the next real segment and returns its first address.
    pub fn add(&mut self) -> Relocatable {
        self.memory.data.push(Vec::new());
        Relocatable::from((self.memory.data.len() as isize - 1, 0))
    }

    /// Allocates the next temporary segment (-1, -2, ...) and returns its first address.
    pub fn add_temporary_segment(&mut self) -> Relocatable {
        self.memory.temp_data.push(Vec::new());
        Relocatable::from((-(self.memory.temp_data.len() as isize), 0))
    }

    /// Writes `data` from `ptr` onwards and returns the address right after it.
    pub fn load_data(
        &mut self,
        ptr: Relocatable,
        data: &[MaybeRelocatable],
    ) -> Result<Relocatable, MemoryError> {
        // Writing back to front grows the segment once.
        for (i, value) in data.iter().enumerate().rev() {
            self.memory.insert((ptr + i)?, value)?;
        }
        Ok((ptr + data.len())?)
    }

    /// Computes the used size of every real segment. Only the first call does any work.
    pub fn compute_effective_sizes(&mut self) -> &Vec<usize> {
        self.segment_used_sizes
            .get_or_insert_with(|| self.memory.data.iter().map(Vec::len).collect())
    }

    pub fn get_segment_used_size(&self, index: usize) -> Option<usize> {
        self.segment_used_sizes.as_ref()?.get(index).copied()
    }

    /// The finalized size of a segment, or its used size if it wasn't finalized.
    pub fn get_segment_size(&self, index: usize) -> Option<usize> {
        self.segment_sizes
            .get(&index)
            .copied()
            .or_else(|| self.get_segment_used_size(index))
    }

    /// Base address of every segment in the flat address space.
    ///
    /// Segment 0 starts at 1 and each following segment starts right after the
    /// previous one. Requires [`Self::compute_effective_sizes`] to have run.
    pub fn relocate_segments(&self) -> Result<Vec<usize>, MemoryError> {
        let used_sizes = self
            .segment_used_sizes
            .as_ref()
            .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        let mut relocation_table = Vec::with_capacity(used_sizes.len());
        let mut next_base = 1;
        for index in 0..used_sizes.len() {
            relocation_table.push(next_base);
            next_base += self
                .get_segment_size(index)
                .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        }
        Ok(relocation_table)
    }

    /// Flattens memory using `relocation_table`.
    ///
    /// Index `i` of the result holds the value at flat address `i`; unwritten
    /// addresses (including address 0) are `None`. Every temporary segment must
    /// have been relocated beforehand.
    pub fn relocate_memory(
        &self,
        relocation_table: &[usize],
    ) -> Result<Vec<Option<Felt252>>, MemoryError> {
        if let Some(index) = self.memory.temp_data.iter().position(|s| !s.is_empty()) {
            return Err(MemoryError::TemporarySegmentInRelocation(
                -(index as isize) - 1,
            ));
        }
        let mut relocated = vec![None];
        for (index, segment) in self.memory.data.iter().enumerate() {
            let base = *relocation_table
                .get(index)
                .ok_or(MemoryError::Relocation)?;
            for (offset, cell) in segment.iter().enumerate() {
                let Some(cell) = cell else { continue };
                let address = base + offset;
                let value = relocate_value(cell.get_value().clone(), relocation_table)?;
                if relocated.len() <= address {
                    relocated.resize(address + 1, None);
                }
                relocated[address] = Some(value);
            }
        }
        Ok(relocated)
    }

    /// Turns a hint or entrypoint argument into a memory value, allocating a
    /// fresh segment for vectors.
    pub fn gen_arg(&mut self, arg: &dyn Any) -> Result<MaybeRelocatable, MemoryError> {
        if let Some(value) = arg.downcast_ref::<MaybeRelocatable>() {
            return Ok(value.clone());
        }
        let values: Vec<MaybeRelocatable> =
            if let Some(values) = arg.downcast_ref::<Vec<MaybeRelocatable>>() {
                values.clone()
            } else if let Some(values) = arg.downcast_ref::<Vec<Relocatable>>() {
                values.iter().map(MaybeRelocatable::from).collect()
            } else if let Some(values) = arg.downcast_ref::<Vec<Felt252>>() {
                values.iter().map(MaybeRelocatable::from).collect()
            } else {
                return Err(MemoryError::GenArgInvalidType);
            };
        let base = self.add();
        self.load_data(base, &values)?;
        Ok(base.into())
    }

    /// Whether `value` may appear in the final memory: integers always, and
    /// relocatables pointing into an existing real segment.
    pub fn is_valid_memory_value(&self, value: &MaybeRelocatable) -> Result<bool, MemoryError> {
        let used_sizes = self
            .segment_used_sizes
            .as_ref()
            .ok_or(MemoryError::MissingSegmentUsedSizes)?;
        match value {
            MaybeRelocatable::Int(_) => Ok(true),
            MaybeRelocatable::RelocatableValue(addr) => {
                let index = usize::try_from(addr.segment_index)
                    .map_err(|_| MemoryError::AddressInTemporarySegment(addr.segment_index))?;
                Ok(index < used_sizes.len())
            }
        }
    }

    /// Counts allocated cells never accessed during the run.
    ///
    /// Segments listed in `builtin_segments` are skipped, and so are segments
    /// where nothing was accessed.
    pub fn get_memory_holes(&self, builtin_segments: &[usize]) -> Result<usize, MemoryError> {
        let mut memory_holes = 0;
        for index in 0..self.num_segments() {
            if builtin_segments.contains(&index) {
                continue;
            }
            let accessed = match self.memory.get_amount_of_accessed_addresses_for_segment(index) {
                Some(accessed) if accessed > 0 => accessed,
                _ => continue,
            };
            let size = self
                .get_segment_size(index)
                .ok_or(MemoryError::MissingSegmentUsedSizes)?;
            if accessed > size {
                return Err(MemoryError::SegmentHasMoreAccessedAddressesThanSize(
                    Box::new((index, accessed, size)),
                ));
            }
            memory_holes += size - accessed;
        }
        Ok(memory_holes)
    }

    /// Flat (address, page_id) pairs of the public memory, given the result of
    /// [`Self::relocate_segments`].
    pub fn get_public_memory_addresses(
        &self,
        relocation_table: &[usize],
    ) -> Result<Vec<(usize, usize)>, MemoryError> {
        let mut addresses = Vec::new();
        for index in 0..self.num_segments() {
            let Some(offsets) = self.public_memory_offsets.get(&index) else {
                continue;
            };
            let base = relocation_table
                .get(index)
                .ok_or(MemoryError::MalformedPublicMemory)?;
            addresses.extend(offsets.iter().map(|(offset, page)| (base + offset, *page)));
        }
        Ok(addresses)
    }

    /// Records the final size and public memory offsets of a segment.
    pub(crate) fn finalize(
        &mut self,
        size: Option<usize>,
        segment_index: usize,
        public_memory: Option<&Vec<(usize, usize)>>,
    ) {
        if let Some(size) = size {
            self.segment_sizes.insert(segment_index, size);
        }
        self.public_memory_offsets
            .insert(segment_index, public_memory.cloned().unwrap_or_default());
    }
}

impl Default for MemorySegmentManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemorySegmentManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Memory:\n{}", self.memory)?;
        if let Some(used_sizes) = &self.segment_used_sizes {
            writeln!(f, "Segment Info:")?;
            for (index, used_size) in used_sizes.iter().enumerate() {
                match self.segment_sizes.get(&index) {
                    Some(size) => writeln!(f, "Segment {index}: used {used_size}, size {size}")?,
                    None => writeln!(f, "Segment {index}: used {used_size}")?,
                }
            }
        }
        Ok(())
    }
}
