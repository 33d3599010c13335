//! MIPS32 instruction words
//!
//! Every MIPS32 instruction is a single big-or-little endian 32-bit word, so patterns are expressed as plain `u32` values
//! plus masks for the fields that are allowed to vary (usually a register number).

/// `sll $zero, $zero, 0`, the canonical no-op
pub const NOP: u32 = 0x0000_0000;
/// Opcode bits of `addiu rt, rs, imm`
pub const ADDIU: u32 = 0x2400_0000;
/// Opcode bits of `lw rt, offset(base)`
pub const LW: u32 = 0x8C00_0000;
/// Function bits of `tne rs, rt, code` (trap if `rs != rt`)
pub const TNE: u32 = 0x0000_0036;

/// Base register field of load/store instructions (bits 21 to 25)
pub const BASE_MASK: u32 = 0x03E0_0000;
/// RS register field (bits 21 to 25), same position as [`BASE_MASK`]
pub const RS_MASK: u32 = 0x03E0_0000;
/// RT register field (bits 16 to 20)
pub const RT_MASK: u32 = 0x001F_0000;
/// 16-bit immediate/offset field
pub const OFFSET_MASK: u32 = 0x0000_FFFF;
/// Trap code field of the conditional trap instructions (bits 6 to 15)
pub const TRAP_CODE_MASK: u32 = 0x0000_FFC0;

/// Shift of the base register field
pub const BASE_SHIFT: u32 = 21;
/// Shift of the RS register field
pub const RS_SHIFT: u32 = 21;
/// Shift of the RT register field
pub const RT_SHIFT: u32 = 16;
/// Shift of the trap code field
pub const TRAP_CODE_SHIFT: u32 = 6;

/// `$zero`
pub const REG_ZERO: u8 = 0;
/// `$v0`
pub const REG_V0: u8 = 2;
/// `$v1`
pub const REG_V1: u8 = 3;
/// `$a0`
pub const REG_A0: u8 = 4;

/// Places a register number into the field starting at `shift`
const fn reg(reg: u8, shift: u32) -> u32 {
    ((reg as u32) & 0x1F) << shift
}

/// Encodes `lw rt, offset(base)`
pub const fn lw(rt: u8, base: u8, offset: u16) -> u32 {
    LW | reg(base, BASE_SHIFT) | reg(rt, RT_SHIFT) | offset as u32
}

/// Encodes `addiu rt, rs, imm`
pub const fn addiu(rt: u8, rs: u8, imm: u16) -> u32 {
    ADDIU | reg(rs, RS_SHIFT) | reg(rt, RT_SHIFT) | imm as u32
}

/// Encodes `tne rs, rt, code`
pub const fn tne(rs: u8, rt: u8, code: u16) -> u32 {
    TNE | reg(rs, RS_SHIFT) | reg(rt, RT_SHIFT) | (((code as u32) << TRAP_CODE_SHIFT) & TRAP_CODE_MASK)
}

/// Extracts the RT register number
pub const fn rt(word: u32) -> u8 {
    ((word & RT_MASK) >> RT_SHIFT) as u8
}

/// Extracts the RS (or base) register number
pub const fn rs(word: u32) -> u8 {
    ((word & RS_MASK) >> RS_SHIFT) as u8
}
