use thiserror::Error;

/// Failures while turning a 64-bit word into an [`Instruction`](crate::types::instruction::Instruction).
#[derive(Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Instruction MSB should be 0")]
    NonZeroHighBit,
    #[error("Invalid op1_register value: {0}")]
    InvalidOp1Reg(u64),
    #[error("Invalid pc_update value: {0}")]
    InvalidPcUpdate(u64),
    #[error("Invalid res value: {0}")]
    InvalidRes(u64),
    #[error("Invalid opcode value: {0}")]
    InvalidOpcode(u64),
    #[error("Invalid ap_update value: {0}")]
    InvalidApUpdate(u64),
}
