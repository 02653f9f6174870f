use std::{cell::RefCell, collections::HashMap, rc::Rc};

use starknet_crypto::{verify, Signature};

use super::BuiltinSegment;
use crate::types::instance_definitions::CELLS_PER_SIGNATURE;
use crate::types::relocatable::Relocatable;
use crate::vm::errors::memory_errors::MemoryError;
use crate::vm::vm_memory::memory::{Memory, ValidationRule};
use crate::Felt252;

/// ECDSA builtin. Instances are `(public key, message hash)` pairs, and a
/// signature for each pair must have been registered through a hint before
/// the pair is written.
#[derive(Debug, Clone)]
pub struct SignatureBuiltinRunner {
    pub(crate) segment: BuiltinSegment,
    // Keyed by the address of the public key cell.
    signatures: Rc<RefCell<HashMap<Relocatable, Signature>>>,
}

impl SignatureBuiltinRunner {
    pub fn new(ratio: Option<u32>, included: bool) -> Self {
        SignatureBuiltinRunner {
            segment: BuiltinSegment::new(ratio, included),
            signatures: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Registers `(r, s)` for the instance whose public key lives at `addr`.
    /// A signature registered first for an address wins.
    pub fn add_signature(&self, addr: Relocatable, (r, s): &(Felt252, Felt252)) {
        self.signatures
            .borrow_mut()
            .entry(addr)
            .or_insert(Signature { r: *r, s: *s });
    }

    #[cfg(test)]
    pub(crate) fn signature_at(&self, addr: Relocatable) -> Option<(Felt252, Felt252)> {
        self.signatures.borrow().get(&addr).map(|sig| (sig.r, sig.s))
    }

    pub fn add_validation_rule(&self, memory: &mut Memory) {
        let signatures = Rc::clone(&self.signatures);
        let rule = ValidationRule(Box::new(
            move |memory: &Memory, addr: Relocatable| -> Result<Vec<Relocatable>, MemoryError> {
                let cell_index = addr.offset % CELLS_PER_SIGNATURE as usize;
                let (pubkey_addr, msg_addr) = if cell_index == 0 {
                    (addr, (addr + 1_usize)?)
                } else {
                    ((addr - 1)?, addr)
                };

                // The pair is checked once both halves are written, from
                // whichever write comes second.
                let pubkey = match memory.get_integer(pubkey_addr) {
                    Ok(num) => num,
                    Err(_) if cell_index == 1 => return Ok(vec![]),
                    Err(_) => return Err(MemoryError::PubKeyNonInt(Box::new(pubkey_addr))),
                };
                let msg = match memory.get_integer(msg_addr) {
                    Ok(num) => num,
                    Err(_) if cell_index == 0 => return Ok(vec![]),
                    Err(_) => return Err(MemoryError::MsgNonInt(Box::new(msg_addr))),
                };

                let signatures = signatures.borrow();
                let signature = signatures
                    .get(&pubkey_addr)
                    .ok_or_else(|| MemoryError::SignatureNotFound(Box::new(pubkey_addr)))?;
                match verify(&pubkey, &msg, &signature.r, &signature.s) {
                    Ok(true) => Ok(vec![pubkey_addr, msg_addr]),
                    _ => Err(MemoryError::InvalidSignature(Box::new((
                        format!("({}, {})", signature.r, signature.s),
                        pubkey.into_owned(),
                        msg.into_owned(),
                    )))),
                }
            },
        ));
        memory.add_validation_rule(self.segment.base, rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocatable;
    use crate::types::relocatable::MaybeRelocatable;
    use assert_matches::assert_matches;
    use starknet_crypto::{get_public_key, sign};

    struct SignedMessage {
        pubkey: Felt252,
        msg: Felt252,
        r: Felt252,
        s: Felt252,
    }

    fn signed_message() -> SignedMessage {
        let private_key = Felt252::from(0x1234_5678_u64);
        let msg = Felt252::from(2);
        let signature = sign(&private_key, &msg, &Felt252::from(0xdead_beef_u64)).unwrap();
        SignedMessage {
            pubkey: get_public_key(&private_key),
            msg,
            r: signature.r,
            s: signature.s,
        }
    }

    fn memory_with_rule(builtin: &SignatureBuiltinRunner) -> Memory {
        let mut memory = Memory::new();
        memory.data.push(Vec::new());
        builtin.add_validation_rule(&mut memory);
        memory
    }

    #[test]
    fn valid_signature_marks_both_cells() {
        let signed = signed_message();
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        builtin.add_signature(relocatable!(0, 0), &(signed.r, signed.s));
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 0), signed.pubkey).unwrap();
        memory.insert(relocatable!(0, 1), signed.msg).unwrap();
        assert!(memory.validated_addresses.contains(&relocatable!(0, 0)));
        assert!(memory.validated_addresses.contains(&relocatable!(0, 1)));
    }

    #[test]
    fn message_written_before_pubkey() {
        let signed = signed_message();
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        builtin.add_signature(relocatable!(0, 2), &(signed.r, signed.s));
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 3), signed.msg).unwrap();
        assert!(!memory.validated_addresses.contains(&relocatable!(0, 3)));
        memory.insert(relocatable!(0, 2), signed.pubkey).unwrap();
        assert!(memory.validated_addresses.contains(&relocatable!(0, 3)));
    }

    #[test]
    fn wrong_message_is_rejected() {
        let signed = signed_message();
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        builtin.add_signature(relocatable!(0, 0), &(signed.r, signed.s));
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 0), signed.pubkey).unwrap();
        assert_matches!(
            memory.insert(relocatable!(0, 1), Felt252::from(3)),
            Err(MemoryError::InvalidSignature(bx)) if bx.1 == signed.pubkey && bx.2 == Felt252::from(3)
        );
    }

    #[test]
    fn missing_signature() {
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 0), Felt252::from(5)).unwrap();
        assert_eq!(
            memory.insert(relocatable!(0, 1), Felt252::from(6)),
            Err(MemoryError::SignatureNotFound(Box::new(relocatable!(0, 0))))
        );
    }

    #[test]
    fn relocatable_pubkey() {
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 1), Felt252::from(6)).unwrap();
        assert_eq!(
            memory.insert(relocatable!(0, 0), &MaybeRelocatable::from((1, 0))),
            Err(MemoryError::PubKeyNonInt(Box::new(relocatable!(0, 0))))
        );
    }

    #[test]
    fn relocatable_message() {
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        let mut memory = memory_with_rule(&builtin);
        memory.insert(relocatable!(0, 0), Felt252::from(6)).unwrap();
        assert_eq!(
            memory.insert(relocatable!(0, 1), &MaybeRelocatable::from((1, 0))),
            Err(MemoryError::MsgNonInt(Box::new(relocatable!(0, 1))))
        );
    }

    #[test]
    fn first_registered_signature_wins() {
        let builtin = SignatureBuiltinRunner::new(Some(512), true);
        builtin.add_signature(relocatable!(0, 0), &(Felt252::ONE, Felt252::TWO));
        builtin.add_signature(relocatable!(0, 0), &(Felt252::THREE, Felt252::THREE));
        let signatures = builtin.signatures.borrow();
        assert_eq!(signatures[&relocatable!(0, 0)].r, Felt252::ONE);
    }
}
