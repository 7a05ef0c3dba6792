// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The Sharp LR35902 CPU core: fetch/decode/dispatch, the interrupt
//! pipeline and the register file's memory-mapped high RAM.

pub mod alu;
pub mod interrupts;
pub mod opcodes;
pub mod registers;

use log::trace;

use crate::bits::{bit_edit, bit_get, Direction};
use crate::bus::consts::{HIGH_RAM_START, REG_IE, REG_IF};
use crate::bus::Bus;
use crate::memory::Component;
use crate::GameboyError;
use crate::GbResult;

use alu::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};
use interrupts::InterruptIter;
use opcodes::{build_direct_table, build_prefixed_table, Family, OpEntry};
use registers::{reg16_by_index, reg8_by_index, Reg16, Reg8, Registers};

/// The Sharp LR35902 CPU.
///
/// Owns its register file and the high-RAM [`Component`] (0xFF80..=0xFFFF,
/// including the IE register at the top of that range); everything else —
/// work RAM, the timer, the cartridge — lives on the [`Bus`] this struct is
/// handed on every call. The opcode tables are instance state rather than
/// `const` data purely because building a `[OpEntry; 256]` array isn't
/// possible in a `const fn` without unstable features; they never change
/// after [`Cpu::new`].
pub struct Cpu {
    registers: Registers,
    /// Interrupt master enable.
    ime: bool,
    /// Set by HALT; cleared when a pending interrupt wakes the CPU.
    halt: bool,
    /// Machine cycles remaining before the next fetch.
    idle_time: u8,
    /// The address of this step's store, or 0 if it didn't write to memory.
    write_listener: u16,
    high_ram: Component,
    direct_table: [OpEntry; 256],
    prefixed_table: [OpEntry; 256],
}

impl Cpu {
    /// Creates a CPU with every register at 0 and interrupts disabled.
    pub fn new() -> GbResult<Cpu> {
        Ok(Cpu {
            registers: Registers::new(),
            ime: false,
            halt: false,
            idle_time: 0,
            write_listener: 0,
            high_ram: Component::create(0x80)?,
            direct_table: build_direct_table(),
            prefixed_table: build_prefixed_table(),
        })
    }

    /// Maps high RAM (and the IE register it ends on) onto the bus.
    pub fn plug(&mut self, bus: &mut Bus) -> GbResult<()> {
        bus.plug(&mut self.high_ram, HIGH_RAM_START, REG_IE)
    }

    /// The register file, for host introspection and tests.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// A mutable view of the register file, for test setup and the
    /// boot-ROM-skip path a host may use to jump straight past it.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// The address this step wrote to, or 0 if it didn't write to memory.
    /// Read by the orchestrator after [`Cpu::tick`] to notify bus listeners.
    pub fn write_listener(&self) -> u16 {
        self.write_listener
    }

    /// Sets a bit of IF via a bus write, so the write is also visible to
    /// [`Cpu::write_listener`] and any peripheral watching for it.
    pub fn request_interrupt(&mut self, bus: &mut Bus, interrupt: interrupts::Interrupt) -> GbResult<()> {
        let current = bus.read(REG_IF);
        self.write_mem8(bus, REG_IF, current | interrupt.value())
    }

    /// Advances the CPU by one machine cycle: services a pending interrupt,
    /// fetches and dispatches an instruction, or simply burns down
    /// `idle_time` left over from a prior instruction.
    pub fn tick(&mut self, bus: &mut Bus) -> GbResult<()> {
        self.write_listener = 0;

        if self.idle_time > 0 {
            self.idle_time -= 1;
            return Ok(());
        }

        self.service_interrupt_or_fetch(bus)?;

        // The cycle this very dispatch just charged to idle_time counts as
        // spent; leave idle_time at cycles-1 so the remaining cycles-1
        // ticks (this one already accounted for) are genuinely idle.
        self.idle_time = self.idle_time.saturating_sub(1);
        Ok(())
    }

    fn service_interrupt_or_fetch(&mut self, bus: &mut Bus) -> GbResult<()> {
        let pending = bus.read(REG_IE) & bus.read(REG_IF);

        if self.ime && pending != 0 {
            let interrupt = InterruptIter::new(pending)
                .next()
                .expect("pending != 0 implies at least one bit set");

            self.ime = false;
            let if_reg = bus.read(REG_IF);
            self.write_mem8(bus, REG_IF, if_reg & !interrupt.value())?;

            self.push16(bus, self.registers.pc)?;
            self.registers.pc = interrupt.vector();
            self.idle_time += 5;
            trace!("cpu: dispatching {:?} to 0x{:04x}", interrupt, interrupt.vector());
            return Ok(());
        }

        if self.halt && pending != 0 {
            // The CPU wakes this cycle but doesn't fetch until the next one.
            self.halt = false;
            return Ok(());
        }

        if self.halt {
            return Ok(());
        }

        self.step(bus)
    }

    fn step(&mut self, bus: &mut Bus) -> GbResult<()> {
        let start_pc = self.registers.pc;
        let opcode = bus.read(start_pc);

        let entry = self.direct_table[opcode as usize];

        if entry.family == Family::CbPrefix {
            let cb_opcode = bus.read(start_pc.wrapping_add(1));
            let cb_entry = self.prefixed_table[cb_opcode as usize];
            self.registers.pc = start_pc.wrapping_add(2);
            self.dispatch_cb(bus, cb_entry.family, cb_opcode)?;
            self.idle_time += cb_entry.cycles;
            return Ok(());
        }

        let next_pc = start_pc.wrapping_add(entry.bytes as u16);
        self.registers.pc = next_pc;

        let taken = self.dispatch(bus, entry.family, opcode, start_pc)?;

        self.idle_time += entry.cycles;
        if taken {
            self.idle_time += entry.xtra_cycles;
        }
        Ok(())
    }

    // -- operand helpers --------------------------------------------------

    fn imm8(&self, bus: &Bus, start_pc: u16) -> u8 {
        bus.read(start_pc.wrapping_add(1))
    }

    fn imm16(&self, bus: &Bus, start_pc: u16) -> GbResult<u16> {
        bus.read16(start_pc.wrapping_add(1))
    }

    fn read_r8(&self, bus: &Bus, index: u8) -> u8 {
        match reg8_by_index(index) {
            Some(reg) => self.registers.get8(reg),
            None => bus.read(self.registers.get16(Reg16::HL)),
        }
    }

    fn write_r8(&mut self, bus: &mut Bus, index: u8, value: u8) -> GbResult<()> {
        match reg8_by_index(index) {
            Some(reg) => {
                self.registers.set8(reg, value);
                Ok(())
            }
            None => {
                let addr = self.registers.get16(Reg16::HL);
                self.write_mem8(bus, addr, value)
            }
        }
    }

    fn write_mem8(&mut self, bus: &mut Bus, addr: u16, value: u8) -> GbResult<()> {
        bus.write(addr, value)?;
        self.write_listener = addr;
        Ok(())
    }

    fn write_mem16(&mut self, bus: &mut Bus, addr: u16, value: u16) -> GbResult<()> {
        bus.write16(addr, value)?;
        self.write_listener = addr;
        Ok(())
    }

    fn get_rp(&self, p: u8) -> u16 {
        match reg16_by_index(p) {
            Some(reg) => self.registers.get16(reg),
            None => self.registers.sp,
        }
    }

    fn set_rp(&mut self, p: u8, value: u16) {
        match reg16_by_index(p) {
            Some(reg) => self.registers.set16(reg, value),
            None => self.registers.sp = value,
        }
    }

    fn get_rp2(&self, p: u8) -> u16 {
        match p & 0x03 {
            0 => self.registers.get16(Reg16::BC),
            1 => self.registers.get16(Reg16::DE),
            2 => self.registers.get16(Reg16::HL),
            _ => self.registers.get16(Reg16::AF),
        }
    }

    fn set_rp2(&mut self, p: u8, value: u16) {
        match p & 0x03 {
            0 => self.registers.set16(Reg16::BC, value),
            1 => self.registers.set16(Reg16::DE, value),
            2 => self.registers.set16(Reg16::HL, value),
            _ => self.registers.set16(Reg16::AF, value),
        }
    }

    fn condition(&self, cc: u8) -> bool {
        let f = self.registers.get8(Reg8::F);
        match cc & 0x03 {
            0 => f & FLAG_Z == 0,
            1 => f & FLAG_Z != 0,
            2 => f & FLAG_C == 0,
            _ => f & FLAG_C != 0,
        }
    }

    fn push16(&mut self, bus: &mut Bus, value: u16) -> GbResult<()> {
        self.registers.sp = self.registers.sp.wrapping_sub(2);
        let sp = self.registers.sp;
        self.write_mem16(bus, sp, value)
    }

    fn pop16(&mut self, bus: &Bus) -> GbResult<u16> {
        let value = bus.read16(self.registers.sp)?;
        self.registers.sp = self.registers.sp.wrapping_add(2);
        Ok(value)
    }

    fn alu_dispatch(&mut self, y: u8, operand: u8) {
        let a = self.registers.get8(Reg8::A);
        let carry_in = (self.registers.get8(Reg8::F) & FLAG_C != 0) as u8;

        let result = match y & 0x07 {
            0 => alu::add8(a, operand, 0),
            1 => alu::add8(a, operand, carry_in),
            2 => alu::sub8(a, operand, 0),
            3 => alu::sub8(a, operand, carry_in),
            4 => alu::and8(a, operand),
            5 => alu::xor8(a, operand),
            6 => alu::or8(a, operand),
            _ => alu::sub8(a, operand, 0), // CP
        };

        self.registers.set8(Reg8::F, result.flags);
        if y & 0x07 != 7 {
            self.registers.set8(Reg8::A, result.value as u8);
        }
    }

    // -- direct table dispatch ---------------------------------------------

    fn dispatch(&mut self, bus: &mut Bus, family: Family, opcode: u8, start_pc: u16) -> GbResult<bool> {
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;
        let p = (opcode >> 4) & 0x03;
        let cc = (opcode >> 3) & 0x03;

        match family {
            Family::Nop | Family::Stop => Ok(false),

            Family::Halt => {
                self.halt = true;
                Ok(false)
            }

            Family::Di => {
                self.ime = false;
                Ok(false)
            }

            Family::Ei => {
                self.ime = true;
                Ok(false)
            }

            Family::LdR8R8 => {
                let value = self.read_r8(bus, z);
                self.write_r8(bus, y, value)?;
                Ok(false)
            }

            Family::LdR8N8 => {
                let value = self.imm8(bus, start_pc);
                self.write_r8(bus, y, value)?;
                Ok(false)
            }

            Family::LdRrNn => {
                let value = self.imm16(bus, start_pc)?;
                self.set_rp(p, value);
                Ok(false)
            }

            Family::LdMemA => {
                let p = (opcode >> 4) & 0x03;
                let q = (opcode >> 3) & 0x01;
                let hl = self.registers.get16(Reg16::HL);
                match (p, q) {
                    (0, 0) => {
                        let addr = self.registers.get16(Reg16::BC);
                        self.write_mem8(bus, addr, self.registers.get8(Reg8::A))?;
                    }
                    (0, 1) => {
                        let addr = self.registers.get16(Reg16::BC);
                        let value = bus.read(addr);
                        self.registers.set8(Reg8::A, value);
                    }
                    (1, 0) => {
                        let addr = self.registers.get16(Reg16::DE);
                        self.write_mem8(bus, addr, self.registers.get8(Reg8::A))?;
                    }
                    (1, 1) => {
                        let addr = self.registers.get16(Reg16::DE);
                        let value = bus.read(addr);
                        self.registers.set8(Reg8::A, value);
                    }
                    (2, 0) => {
                        self.write_mem8(bus, hl, self.registers.get8(Reg8::A))?;
                        self.registers.set16(Reg16::HL, hl.wrapping_add(1));
                    }
                    (2, 1) => {
                        self.registers.set8(Reg8::A, bus.read(hl));
                        self.registers.set16(Reg16::HL, hl.wrapping_add(1));
                    }
                    (3, 0) => {
                        self.write_mem8(bus, hl, self.registers.get8(Reg8::A))?;
                        self.registers.set16(Reg16::HL, hl.wrapping_sub(1));
                    }
                    (3, 1) => {
                        self.registers.set8(Reg8::A, bus.read(hl));
                        self.registers.set16(Reg16::HL, hl.wrapping_sub(1));
                    }
                    _ => unreachable!(),
                }
                Ok(false)
            }

            Family::LdNnSp => {
                let addr = self.imm16(bus, start_pc)?;
                let sp = self.registers.sp;
                self.write_mem16(bus, addr, sp)?;
                Ok(false)
            }

            Family::LdHighN8 => {
                let n = self.imm8(bus, start_pc);
                let addr = 0xFF00u16 + n as u16;
                if opcode == 0xE0 {
                    self.write_mem8(bus, addr, self.registers.get8(Reg8::A))?;
                } else {
                    self.registers.set8(Reg8::A, bus.read(addr));
                }
                Ok(false)
            }

            Family::LdHighC => {
                let addr = 0xFF00u16 + self.registers.get8(Reg8::C) as u16;
                if opcode == 0xE2 {
                    self.write_mem8(bus, addr, self.registers.get8(Reg8::A))?;
                } else {
                    self.registers.set8(Reg8::A, bus.read(addr));
                }
                Ok(false)
            }

            Family::LdNnA => {
                let addr = self.imm16(bus, start_pc)?;
                if opcode == 0xEA {
                    self.write_mem8(bus, addr, self.registers.get8(Reg8::A))?;
                } else {
                    self.registers.set8(Reg8::A, bus.read(addr));
                }
                Ok(false)
            }

            Family::LdHlSpE8 => {
                let offset = self.imm8(bus, start_pc) as i8 as i16 as u16;
                let sp = self.registers.sp;
                let low = alu::add16_low(sp, offset);
                let result = sp.wrapping_add(offset);
                let flags = low.flags & (FLAG_H | FLAG_C);
                self.registers.set16(Reg16::HL, result);
                self.registers.set8(Reg8::F, flags);
                Ok(false)
            }

            Family::LdSpHl => {
                self.registers.sp = self.registers.get16(Reg16::HL);
                Ok(false)
            }

            Family::AddSpE8 => {
                let offset = self.imm8(bus, start_pc) as i8 as i16 as u16;
                let sp = self.registers.sp;
                let low = alu::add16_low(sp, offset);
                self.registers.sp = sp.wrapping_add(offset);
                self.registers.set8(Reg8::F, low.flags & (FLAG_H | FLAG_C));
                Ok(false)
            }

            Family::IncDecR8 => {
                let is_inc = z == 4;
                let old = self.read_r8(bus, y);
                let carry_in = (self.registers.get8(Reg8::F) & FLAG_C != 0) as u8;
                let result = if is_inc {
                    alu::add8(old, 1, 0)
                } else {
                    alu::sub8(old, 1, 0)
                };
                self.write_r8(bus, y, result.value as u8)?;
                // INC/DEC leave C untouched.
                let flags = (result.flags & !FLAG_C) | (carry_in * FLAG_C);
                self.registers.set8(Reg8::F, flags);
                Ok(false)
            }

            Family::IncDecR16 => {
                let is_inc = (opcode & 0x08) == 0;
                let value = self.get_rp(p);
                let result = if is_inc { value.wrapping_add(1) } else { value.wrapping_sub(1) };
                self.set_rp(p, result);
                Ok(false)
            }

            Family::AddHlR16 => {
                let hl = self.registers.get16(Reg16::HL);
                let rr = self.get_rp(p);
                let low = alu::add16_low(hl, rr);
                let carry = (low.flags & FLAG_C != 0) as u8;
                let high = alu::add16_high(hl, rr, carry);
                self.registers.set16(Reg16::HL, high.value);
                // Real hardware's ADD HL,rr preserves Z; the literal ALU
                // table derives Z from the 16-bit result, which this
                // instruction deliberately overrides (see DESIGN.md).
                let z_bit = self.registers.get8(Reg8::F) & FLAG_Z;
                self.registers.set8(Reg8::F, z_bit | (high.flags & !FLAG_Z));
                Ok(false)
            }

            Family::RotA => {
                let a = self.registers.get8(Reg8::A);
                let result = match y {
                    0 => alu::rotate(a, Direction::Left),
                    1 => alu::rotate(a, Direction::Right),
                    2 => alu::carry_rotate(a, Direction::Left, self.registers.get8(Reg8::F) & FLAG_C),
                    _ => alu::carry_rotate(a, Direction::Right, self.registers.get8(Reg8::F) & FLAG_C),
                };
                self.registers.set8(Reg8::A, result.value as u8);
                // The accumulator-form rotates always clear Z (unlike the
                // CB-prefixed register form, which sets it normally).
                self.registers.set8(Reg8::F, result.flags & !FLAG_Z);
                Ok(false)
            }

            Family::Daa => {
                let a = self.registers.get8(Reg8::A);
                let result = alu::daa(a, self.registers.get8(Reg8::F));
                self.registers.set8(Reg8::A, result.value as u8);
                self.registers.set8(Reg8::F, result.flags);
                Ok(false)
            }

            Family::Cpl => {
                let a = self.registers.get8(Reg8::A);
                self.registers.set8(Reg8::A, !a);
                self.registers.set8(Reg8::F, self.registers.get8(Reg8::F) | FLAG_N | FLAG_H);
                Ok(false)
            }

            Family::Sccf => {
                let flags = self.registers.get8(Reg8::F);
                let new_flags = if y == 6 { alu::scf(flags) } else { alu::ccf(flags) };
                self.registers.set8(Reg8::F, new_flags);
                Ok(false)
            }

            Family::AluR8 => {
                let operand = self.read_r8(bus, z);
                self.alu_dispatch(y, operand);
                Ok(false)
            }

            Family::AluN8 => {
                let operand = self.imm8(bus, start_pc);
                self.alu_dispatch(y, operand);
                Ok(false)
            }

            Family::Push => {
                let value = self.get_rp2(p);
                self.push16(bus, value)?;
                Ok(false)
            }

            Family::Pop => {
                let value = self.pop16(bus)?;
                self.set_rp2(p, value);
                Ok(false)
            }

            Family::Jp => {
                self.registers.pc = self.imm16(bus, start_pc)?;
                Ok(false)
            }

            Family::JpHl => {
                self.registers.pc = self.registers.get16(Reg16::HL);
                Ok(false)
            }

            Family::JpCc => {
                let target = self.imm16(bus, start_pc)?;
                if self.condition(cc) {
                    self.registers.pc = target;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            Family::Jr => {
                let offset = self.imm8(bus, start_pc) as i8 as i16;
                self.registers.pc = (self.registers.pc as i16).wrapping_add(offset) as u16;
                Ok(false)
            }

            Family::JrCc => {
                let offset = self.imm8(bus, start_pc) as i8 as i16;
                if self.condition(cc) {
                    self.registers.pc = (self.registers.pc as i16).wrapping_add(offset) as u16;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            Family::Call => {
                let target = self.imm16(bus, start_pc)?;
                let return_addr = self.registers.pc;
                self.push16(bus, return_addr)?;
                self.registers.pc = target;
                Ok(false)
            }

            Family::CallCc => {
                let target = self.imm16(bus, start_pc)?;
                if self.condition(cc) {
                    let return_addr = self.registers.pc;
                    self.push16(bus, return_addr)?;
                    self.registers.pc = target;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            Family::Ret => {
                self.registers.pc = self.pop16(bus)?;
                Ok(false)
            }

            Family::RetCc => {
                if self.condition(cc) {
                    self.registers.pc = self.pop16(bus)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }

            Family::Reti => {
                self.registers.pc = self.pop16(bus)?;
                self.ime = true;
                Ok(false)
            }

            Family::Rst => {
                let target = ((opcode >> 3) & 0x07) as u16 * 8;
                let return_addr = self.registers.pc;
                self.push16(bus, return_addr)?;
                self.registers.pc = target;
                Ok(false)
            }

            Family::CbPrefix
            | Family::CbRot
            | Family::CbBit
            | Family::CbRes
            | Family::CbSet
            | Family::Invalid => Err(GameboyError::Instr(opcode)),
        }
    }

    // -- CB-prefixed table dispatch -----------------------------------------

    fn dispatch_cb(&mut self, bus: &mut Bus, family: Family, opcode: u8) -> GbResult<()> {
        let y = (opcode >> 3) & 0x07;
        let z = opcode & 0x07;

        match family {
            Family::CbRot => {
                let value = self.read_r8(bus, z);
                let result = match y {
                    0 => alu::rotate(value, Direction::Left),
                    1 => alu::rotate(value, Direction::Right),
                    2 => alu::carry_rotate(value, Direction::Left, self.registers.get8(Reg8::F) & FLAG_C),
                    3 => alu::carry_rotate(value, Direction::Right, self.registers.get8(Reg8::F) & FLAG_C),
                    4 => alu::shift(value, Direction::Left),
                    5 => alu::shift_r_arithmetic(value),
                    6 => {
                        let swapped = (value << 4) | (value >> 4);
                        alu::AluResult { value: swapped as u16, flags: if swapped == 0 { FLAG_Z } else { 0 } }
                    }
                    _ => alu::shift(value, Direction::Right),
                };
                self.write_r8(bus, z, result.value as u8)?;
                self.registers.set8(Reg8::F, result.flags);
                Ok(())
            }

            Family::CbBit => {
                let value = self.read_r8(bus, z);
                let is_zero = !bit_get(value, y);
                let flags = (self.registers.get8(Reg8::F) & FLAG_C) | FLAG_H | if is_zero { FLAG_Z } else { 0 };
                self.registers.set8(Reg8::F, flags);
                Ok(())
            }

            Family::CbRes => {
                let value = self.read_r8(bus, z);
                self.write_r8(bus, z, bit_edit(value, y, false))
            }

            Family::CbSet => {
                let value = self.read_r8(bus, z);
                self.write_r8(bus, z, bit_edit(value, y, true))
            }

            _ => Err(GameboyError::Instr(opcode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::consts::REGISTERS_START;
    use crate::memory::Component;

    fn cpu_on_bus() -> (Cpu, Bus) {
        let mut bus = Bus::new();
        let mut cpu = Cpu::new().unwrap();
        cpu.plug(&mut bus).unwrap();

        let mut ram = Component::create(0x8000).unwrap();
        bus.plug(&mut ram, 0x0000, 0x7FFF).unwrap();
        let mut work_ram = Component::create(0x2000).unwrap();
        bus.plug(&mut work_ram, crate::bus::consts::WORK_RAM_START, crate::bus::consts::WORK_RAM_END)
            .unwrap();
        let mut registers_ram = Component::create(0x80).unwrap();
        bus.plug(&mut registers_ram, REGISTERS_START, 0xFF7F).unwrap();

        (cpu, bus)
    }

    #[test]
    fn test_add_with_carry_scenario() {
        let (mut cpu, mut bus) = cpu_on_bus();
        cpu.registers_mut().set8(Reg8::A, 0xFF);
        cpu.registers_mut().set8(Reg8::B, 0x01);
        bus.write(0x0000, 0x80).unwrap(); // ADD A,B
        cpu.tick(&mut bus).unwrap();

        assert_eq!(cpu.registers().get8(Reg8::A), 0);
        let f = cpu.registers().get8(Reg8::F);
        assert_eq!(f, FLAG_Z | FLAG_H | FLAG_C);
    }

    #[test]
    fn test_conditional_jump_not_taken_advances_pc_only() {
        let (mut cpu, mut bus) = cpu_on_bus();
        cpu.registers_mut().set8(Reg8::F, FLAG_Z);
        bus.write(0x0000, 0x20).unwrap(); // JR NZ,+5
        bus.write(0x0001, 0x05).unwrap();
        cpu.tick(&mut bus).unwrap();

        assert_eq!(cpu.registers().pc, 0x0002);
    }

    #[test]
    fn test_interrupt_dispatch_scenario() {
        let (mut cpu, mut bus) = cpu_on_bus();
        cpu.ime = true;
        bus.write(REG_IE, 0x04).unwrap();
        bus.write(REG_IF, 0x04).unwrap();
        cpu.registers_mut().pc = 0x1234;
        cpu.registers_mut().sp = 0xC010;

        cpu.tick(&mut bus).unwrap();

        assert!(!cpu.ime);
        assert_eq!(bus.read(REG_IF) & 0x04, 0);
        assert_eq!(bus.read16(0xC00E).unwrap(), 0x1234);
        assert_eq!(cpu.registers().pc, 0x0050);
        assert_eq!(cpu.idle_time, 4); // 5 charged, one already consumed by this tick
    }

    #[test]
    fn test_halt_wakes_on_pending_interrupt() {
        let (mut cpu, mut bus) = cpu_on_bus();
        cpu.halt = true;
        cpu.ime = false;
        bus.write(REG_IE, 0x01).unwrap();
        bus.write(REG_IF, 0x01).unwrap();
        bus.write(0x0000, 0x00).unwrap(); // NOP, fetched only once HALT clears

        cpu.tick(&mut bus).unwrap();
        assert!(!cpu.halt);
        assert_eq!(cpu.registers().pc, 0, "wake cycle doesn't fetch");

        cpu.tick(&mut bus).unwrap();
        assert_eq!(cpu.registers().pc, 1, "next cycle fetches the NOP normally");
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let (mut cpu, mut bus) = cpu_on_bus();
        cpu.registers_mut().sp = 0xC100;
        cpu.push16(&mut bus, 0xBEEF).unwrap();
        let value = cpu.pop16(&bus).unwrap();
        assert_eq!(value, 0xBEEF);
        assert_eq!(cpu.registers().sp, 0xC100);
    }
}
