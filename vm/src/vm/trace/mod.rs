pub mod trace_entry {
    use serde::{Deserialize, Serialize};

    use crate::{
        types::relocatable::{relocate_address, Relocatable},
        vm::errors::trace_errors::TraceError,
    };

    /// Register values before an instruction ran.
    ///
    /// `pc` is an offset into the program segment and `ap`/`fp` are offsets into
    /// the execution segment, which is always segment 1.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
    pub struct TraceEntry {
        pub pc: usize,
        pub ap: usize,
        pub fp: usize,
    }

    /// A [`TraceEntry`] with every register mapped into the flat address space.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
    pub struct RelocatedTraceEntry {
        pub pc: usize,
        pub ap: usize,
        pub fp: usize,
    }

    const PROGRAM_SEGMENT: isize = 0;
    const EXECUTION_SEGMENT: isize = 1;

    /// Relocates one entry using a table produced by
    /// [`MemorySegmentManager::relocate_segments`](crate::vm::vm_memory::memory_segments::MemorySegmentManager::relocate_segments).
    pub fn relocate_trace_register(
        entry: &TraceEntry,
        relocation_table: &[usize],
    ) -> Result<RelocatedTraceEntry, TraceError> {
        let flatten = |segment_index, offset| {
            relocate_address(
                Relocatable {
                    segment_index,
                    offset,
                },
                relocation_table,
            )
            .map_err(|_| TraceError::NoRelocationFound)
        };
        Ok(RelocatedTraceEntry {
            pc: flatten(PROGRAM_SEGMENT, entry.pc)?,
            ap: flatten(EXECUTION_SEGMENT, entry.ap)?,
            fp: flatten(EXECUTION_SEGMENT, entry.fp)?,
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use assert_matches::assert_matches;

        #[test]
        fn relocate_entry() {
            let entry = TraceEntry { pc: 3, ap: 7, fp: 2 };
            assert_eq!(
                relocate_trace_register(&entry, &[1, 25, 94]).unwrap(),
                RelocatedTraceEntry {
                    pc: 4,
                    ap: 32,
                    fp: 27
                }
            );
        }

        #[test]
        fn relocate_entry_without_execution_segment() {
            let entry = TraceEntry { pc: 0, ap: 0, fp: 0 };
            assert_matches!(
                relocate_trace_register(&entry, &[1]),
                Err(TraceError::NoRelocationFound)
            );
        }
    }
}
