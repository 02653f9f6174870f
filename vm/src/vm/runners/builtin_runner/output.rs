use super::BuiltinSegment;
use crate::types::relocatable::{MaybeRelocatable, Relocatable};
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::vm_memory::memory_segments::MemorySegmentManager;

/// Write-through segment holding the program's public output.
#[derive(Debug, Clone)]
pub struct OutputBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
}

impl OutputBuiltinRunner {
    pub fn new(included: bool) -> OutputBuiltinRunner {
        OutputBuiltinRunner {
            segment: BuiltinSegment::new(None, included),
        }
    }

    /// The values written to the output segment, in order.
    ///
    /// Fails on a gap, since every output cell up to the segment's end must
    /// be set. Needs the segments' effective sizes.
    pub fn get_output(
        &self,
        segments: &MemorySegmentManager,
    ) -> Result<Vec<MaybeRelocatable>, MemoryError> {
        let size = self.segment.used_cells(segments)?;
        let base = Relocatable::from((self.segment.base as isize, 0));
        segments.memory.get_continuous_range(base, size)
    }
}

impl Default for OutputBuiltinRunner {
    fn default() -> Self {
        Self::new(true)
    }
}
