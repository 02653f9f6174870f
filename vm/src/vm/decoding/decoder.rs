use crate::{
    types::instruction::{
        ApUpdate, FpUpdate, Instruction, Op1Addr, Opcode, PcUpdate, Register, Res,
    },
    vm::errors::decode_errors::DecodeError,
};

//  0|  opcode|ap_update|pc_update|res_logic|op1_src|op0_reg|dst_reg
// 15|14 13 12|    11 10|  9  8  7|     6  5|4  3  2|      1|      0

const HIGH_BIT: u64 = 1u64 << 63;
const FLAGS_OFFSET: u64 = 48;
const OFFSET_MASK: u64 = 0xFFFF;
const OFFSET_BIAS: i64 = 1 << 15;

/// Extracts the flag group selected by `mask`, shifted down to bit 0.
fn flag_group(flags: u64, mask: u64) -> u64 {
    (flags & mask) >> mask.trailing_zeros()
}

/// Decodes a 64-bit instruction word.
///
/// The three offsets occupy the low 48 bits, 16 bits each, stored with a bias of
/// 2^15. The flags occupy bits 48 to 62, and bit 63 must be zero.
pub fn decode_instruction(encoded_instr: u64) -> Result<Instruction, DecodeError> {
    if encoded_instr & HIGH_BIT != 0 {
        return Err(DecodeError::NonZeroHighBit);
    }

    let off0 = decode_offset(encoded_instr);
    let off1 = decode_offset(encoded_instr >> 16);
    let off2 = decode_offset(encoded_instr >> 32);

    let flags = encoded_instr >> FLAGS_OFFSET;

    let dst_register = match flag_group(flags, 0x0001) {
        0 => Register::AP,
        _ => Register::FP,
    };

    let op0_register = match flag_group(flags, 0x0002) {
        0 => Register::AP,
        _ => Register::FP,
    };

    let op1_addr = match flag_group(flags, 0x001C) {
        0 => Op1Addr::Op0,
        1 => Op1Addr::Imm,
        2 => Op1Addr::FP,
        4 => Op1Addr::AP,
        other => return Err(DecodeError::InvalidOp1Reg(other)),
    };

    let pc_update = match flag_group(flags, 0x0380) {
        0 => PcUpdate::Regular,
        1 => PcUpdate::Jump,
        2 => PcUpdate::JumpRel,
        4 => PcUpdate::Jnz,
        other => return Err(DecodeError::InvalidPcUpdate(other)),
    };

    // A conditional jump leaves res unconstrained.
    let res = match (flag_group(flags, 0x0060), pc_update) {
        (0, PcUpdate::Jnz) => Res::Unconstrained,
        (0, _) => Res::Op1,
        (1, _) => Res::Add,
        (2, _) => Res::Mul,
        (other, _) => return Err(DecodeError::InvalidRes(other)),
    };

    let opcode = match flag_group(flags, 0x7000) {
        0 => Opcode::NOp,
        1 => Opcode::Call,
        2 => Opcode::Ret,
        4 => Opcode::AssertEq,
        other => return Err(DecodeError::InvalidOpcode(other)),
    };

    // A call always pushes two cells.
    let ap_update = match (flag_group(flags, 0x0C00), opcode) {
        (0, Opcode::Call) => ApUpdate::Add2,
        (0, _) => ApUpdate::Regular,
        (1, _) => ApUpdate::Add,
        (2, _) => ApUpdate::Add1,
        (other, _) => return Err(DecodeError::InvalidApUpdate(other)),
    };

    let fp_update = match opcode {
        Opcode::Call => FpUpdate::APPlus2,
        Opcode::Ret => FpUpdate::Dst,
        _ => FpUpdate::Regular,
    };

    Ok(Instruction {
        off0,
        off1,
        off2,
        dst_register,
        op0_register,
        op1_addr,
        res,
        pc_update,
        ap_update,
        fp_update,
        opcode,
    })
}

fn decode_offset(word: u64) -> isize {
    ((word & OFFSET_MASK) as i64 - OFFSET_BIAS) as isize
}
