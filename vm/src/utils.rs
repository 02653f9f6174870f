use crate::types::relocatable::Relocatable;
use lazy_static::lazy_static;
use num_bigint::BigUint;
use num_traits::Num;

pub const PRIME_STR: &str = "0x800000000000011000000000000000000000000000000000000000000000001";

#[macro_export]
macro_rules! relocatable {
    ($val1 : expr, $val2 : expr) => {
        $crate::types::relocatable::Relocatable {
            segment_index: $val1,
            offset: $val2,
        }
    };
}

lazy_static! {
    pub static ref CAIRO_PRIME: BigUint =
        BigUint::from_str_radix(&PRIME_STR[2..], 16).unwrap_or_default();
}

#[macro_export]
macro_rules! any_box {
    ($val : expr) => {
        Box::new($val) as Box<dyn core::any::Any>
    };
}

/// Returns true if every element of `subsequence` appears in `sequence`, in the same order.
pub fn is_subsequence<T: PartialEq>(subsequence: &[T], mut sequence: &[T]) -> bool {
    for search in subsequence {
        if let Some(index) = sequence.iter().position(|element| search == element) {
            sequence = &sequence[index + 1..];
        } else {
            return false;
        }
    }
    true
}

/// Maps an address to the (segment, offset) pair used to index memory vectors.
/// Temporary segments -1, -2, ... map to indexes 0, 1, ... of the temporary storage.
pub fn from_relocatable_to_indexes(relocatable: Relocatable) -> (usize, usize) {
    if relocatable.segment_index.is_negative() {
        (
            -(relocatable.segment_index + 1) as usize,
            relocatable.offset,
        )
    } else {
        (relocatable.segment_index as usize, relocatable.offset)
    }
}
