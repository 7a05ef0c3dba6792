// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The direct and CB-prefixed opcode tables.
//!
//! Per the design notes, these are data, not code: each of the 256 entries
//! in both tables is a small record tagged by [`Family`], and
//! [`crate::cpu::Cpu`]'s dispatcher is a single match on that tag. The
//! tables themselves are generated once from the Sharp LR35902's regular
//! `xx yyy zzz` opcode bit layout rather than hand-typed row by row — the
//! layout is as much "static data" as a literal array literal would be,
//! and a 512-line literal table would just be this same bit pattern
//! spelled out by hand.

/// A dispatch family: every opcode that reaches the same arm of
/// [`crate::cpu::Cpu`]'s dispatcher shares one of these tags. Operand
/// registers are re-derived from the opcode byte inside each arm rather
/// than stored per-entry, keeping the table itself down to the five fields
/// the spec calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Family {
    AluR8,
    AluN8,
    IncDecR8,
    IncDecR16,
    AddHlR16,
    RotA,
    Daa,
    Cpl,
    Sccf,
    LdR8R8,
    LdR8N8,
    LdRrNn,
    LdMemA,
    LdNnSp,
    LdHighN8,
    LdHighC,
    LdNnA,
    LdHlSpE8,
    LdSpHl,
    AddSpE8,
    Push,
    Pop,
    Jp,
    JpHl,
    JpCc,
    Jr,
    JrCc,
    Call,
    CallCc,
    Ret,
    RetCc,
    Reti,
    Rst,
    Di,
    Ei,
    Halt,
    Stop,
    Nop,
    CbPrefix,
    CbRot,
    CbBit,
    CbRes,
    CbSet,
    Invalid,
}

/// One row of an opcode table: `(family, bytes, cycles, xtra_cycles)`, with
/// the opcode value itself being the table index.
///
/// `cycles`/`xtra_cycles` are counted in machine cycles (one `Cpu::tick`
/// call each, matching [`crate::bus::timer::Timer::tick`]'s 4-T-state
/// unit), not T-states: a `LD r,r` costs 1, `LD r,n` costs 2, and so on.
#[derive(Debug, Clone, Copy)]
pub struct OpEntry {
    /// The dispatch family this opcode belongs to.
    pub family: Family,
    /// Total instruction length in bytes, including the opcode byte
    /// itself (and the CB prefix byte, for [`Family::CbPrefix`]'s target
    /// table — the CB table's own entries report only their second byte,
    /// since `bytes` there is unused for PC advancement).
    pub bytes: u8,
    /// Base machine-cycle cost, added to `idle_time` on dispatch.
    pub cycles: u8,
    /// Additional machine cycles added only when a conditional
    /// branch/call/return is taken.
    pub xtra_cycles: u8,
}

const fn entry(family: Family, bytes: u8, cycles: u8, xtra_cycles: u8) -> OpEntry {
    OpEntry {
        family,
        bytes,
        cycles,
        xtra_cycles,
    }
}

/// Builds the 256-entry direct opcode table from the opcode's `xx yyy zzz`
/// bit decomposition (the standard Z80/LR35902 instruction layout).
pub fn build_direct_table() -> [OpEntry; 256] {
    let mut table = [entry(Family::Invalid, 1, 4, 0); 256];

    for opcode in 0..=255u8 {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let q = y & 1;

        table[opcode as usize] = match (x, z, y) {
            (0, 0, 0) => entry(Family::Nop, 1, 1, 0),
            (0, 0, 1) => entry(Family::LdNnSp, 3, 5, 0),
            (0, 0, 2) => entry(Family::Stop, 2, 1, 0),
            (0, 0, 3) => entry(Family::Jr, 2, 3, 0),
            (0, 0, 4..=7) => entry(Family::JrCc, 2, 2, 1),

            (0, 1, _) if q == 0 => entry(Family::LdRrNn, 3, 3, 0),
            (0, 1, _) => entry(Family::AddHlR16, 1, 2, 0),

            (0, 2, _) => entry(Family::LdMemA, 1, 2, 0),

            (0, 3, _) => entry(Family::IncDecR16, 1, 2, 0),

            (0, 4, 6) => entry(Family::IncDecR8, 1, 3, 0),
            (0, 4, _) => entry(Family::IncDecR8, 1, 1, 0),

            (0, 5, 6) => entry(Family::IncDecR8, 1, 3, 0),
            (0, 5, _) => entry(Family::IncDecR8, 1, 1, 0),

            (0, 6, 6) => entry(Family::LdR8N8, 2, 3, 0),
            (0, 6, _) => entry(Family::LdR8N8, 2, 2, 0),

            (0, 7, 0..=3) => entry(Family::RotA, 1, 1, 0),
            (0, 7, 4) => entry(Family::Daa, 1, 1, 0),
            (0, 7, 5) => entry(Family::Cpl, 1, 1, 0),
            (0, 7, 6..=7) => entry(Family::Sccf, 1, 1, 0),

            (1, 6, 6) => entry(Family::Halt, 1, 1, 0),
            (1, 6, _) | (1, _, 6) => entry(Family::LdR8R8, 1, 2, 0),
            (1, _, _) => entry(Family::LdR8R8, 1, 1, 0),

            (2, 6, _) => entry(Family::AluR8, 1, 2, 0),
            (2, _, _) => entry(Family::AluR8, 1, 1, 0),

            (3, 0, 0..=3) => entry(Family::RetCc, 1, 2, 3),
            (3, 0, 4) => entry(Family::LdHighN8, 2, 3, 0),
            (3, 0, 5) => entry(Family::AddSpE8, 2, 4, 0),
            (3, 0, 6) => entry(Family::LdHighN8, 2, 3, 0),
            (3, 0, 7) => entry(Family::LdHlSpE8, 2, 3, 0),

            (3, 1, _) if q == 0 => entry(Family::Pop, 1, 3, 0),
            (3, 1, 1) => entry(Family::Ret, 1, 4, 0),
            (3, 1, 3) => entry(Family::Reti, 1, 4, 0),
            (3, 1, 5) => entry(Family::JpHl, 1, 1, 0),
            (3, 1, 7) => entry(Family::LdSpHl, 1, 2, 0),

            (3, 2, 0..=3) => entry(Family::JpCc, 3, 3, 1),
            (3, 2, 4) => entry(Family::LdHighC, 1, 2, 0),
            (3, 2, 5) => entry(Family::LdNnA, 3, 4, 0),
            (3, 2, 6) => entry(Family::LdHighC, 1, 2, 0),
            (3, 2, 7) => entry(Family::LdNnA, 3, 4, 0),

            (3, 3, 0) => entry(Family::Jp, 3, 4, 0),
            (3, 3, 1) => entry(Family::CbPrefix, 1, 1, 0),
            (3, 3, 6) => entry(Family::Di, 1, 1, 0),
            (3, 3, 7) => entry(Family::Ei, 1, 1, 0),

            (3, 4, 0..=3) => entry(Family::CallCc, 3, 3, 3),

            (3, 5, _) if q == 0 => entry(Family::Push, 1, 4, 0),
            (3, 5, 1) => entry(Family::Call, 3, 6, 0),

            (3, 6, _) => entry(Family::AluN8, 2, 2, 0),

            (3, 7, _) => entry(Family::Rst, 1, 4, 0),

            _ => entry(Family::Invalid, 1, 1, 0),
        };
    }

    table
}

/// Builds the 256-entry CB-prefixed opcode table.
pub fn build_prefixed_table() -> [OpEntry; 256] {
    let mut table = [entry(Family::Invalid, 0, 2, 0); 256];

    for opcode in 0..=255u8 {
        let x = opcode >> 6;
        let z = opcode & 0x07;
        let targets_hl = z == 6;

        table[opcode as usize] = match x {
            0 => entry(Family::CbRot, 0, if targets_hl { 4 } else { 2 }, 0),
            1 => entry(Family::CbBit, 0, if targets_hl { 3 } else { 2 }, 0),
            2 => entry(Family::CbRes, 0, if targets_hl { 4 } else { 2 }, 0),
            3 => entry(Family::CbSet, 0, if targets_hl { 4 } else { 2 }, 0),
            _ => unreachable!(),
        };
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nop_and_halt() {
        let table = build_direct_table();
        assert_eq!(table[0x00].family, Family::Nop);
        assert_eq!(table[0x76].family, Family::Halt);
    }

    #[test]
    fn test_ld_r8_r8_region_is_fully_covered() {
        let table = build_direct_table();
        for opcode in 0x40..=0x7Fu8 {
            if opcode == 0x76 {
                continue;
            }
            assert_eq!(table[opcode as usize].family, Family::LdR8R8);
        }
    }

    #[test]
    fn test_cb_table_distinguishes_hl_operand_cost() {
        let table = build_prefixed_table();
        assert_eq!(table[0x00].cycles, 2); // RLC B
        assert_eq!(table[0x06].cycles, 4); // RLC (HL)
        assert_eq!(table[0x40].cycles, 2); // BIT 0,B
        assert_eq!(table[0x46].cycles, 3); // BIT 0,(HL)
    }
}
