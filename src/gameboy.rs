// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The orchestrator: wires every peripheral onto one [`Bus`], owns the
//! boot-ROM handoff, and drives the fetch/tick/notify loop.

use log::info;

use crate::bus::bootrom::{BootRom, REG_BOOT_ROM_DISABLE};
use crate::bus::cartridge::Cartridge;
use crate::bus::consts::*;
use crate::bus::joypad::Joypad;
use crate::bus::lcd::Lcd;
use crate::bus::serial::SerialTap;
use crate::bus::timer::Timer;
use crate::bus::{Bus, BusListener};
use crate::config::Config;
use crate::cpu::Cpu;
use crate::memory::Component;
use crate::GbResult;

/// A fully wired Game Boy: the CPU, its bus, and every peripheral this core
/// emulates.
///
/// Construction order matters, since later plugs shadow earlier ones at an
/// overlapping address: the generic RAM regions go down first, then the
/// CPU's high RAM and the peripherals' own registers, and the boot ROM goes
/// down last so it shadows the cartridge until it disables itself.
pub struct Gameboy {
    bus: Bus,
    cpu: Cpu,
    timer: Timer,
    cartridge: Cartridge,
    boot_rom: BootRom,
    lcd: Lcd,
    joypad: Joypad,
    serial_tap: Option<SerialTap>,
    /// `true` while the boot ROM still shadows the cartridge.
    boot: bool,
    cycle: usize,
    // Kept plugged for their bus-backed memory, though nothing but the bus
    // itself ever reads them through this struct.
    _work_ram: Component,
    _echo_ram: Component,
    _video_ram: Component,
    _extern_ram: Component,
    _graph_ram: Component,
    _registers: Component,
    _useless: Component,
}

impl Gameboy {
    /// Builds a Game Boy from `cartridge_data` (a raw cartridge file image)
    /// and `config`.
    pub fn new(cartridge_data: &[u8], config: &Config) -> GbResult<Gameboy> {
        let mut bus = Bus::new();

        let mut work_ram = Component::create((WORK_RAM_END - WORK_RAM_START) as usize + 1)?;
        bus.plug(&mut work_ram, WORK_RAM_START, WORK_RAM_END)?;
        let mut echo_ram = Component::share(&work_ram);
        bus.plug(&mut echo_ram, ECHO_RAM_START, ECHO_RAM_END)?;

        let mut video_ram = Component::create((VIDEO_RAM_END - VIDEO_RAM_START) as usize + 1)?;
        bus.plug(&mut video_ram, VIDEO_RAM_START, VIDEO_RAM_END)?;

        let mut extern_ram = Component::create((EXTERN_RAM_END - EXTERN_RAM_START) as usize + 1)?;
        bus.plug(&mut extern_ram, EXTERN_RAM_START, EXTERN_RAM_END)?;

        let mut graph_ram = Component::create((GRAPH_RAM_END - GRAPH_RAM_START) as usize + 1)?;
        bus.plug(&mut graph_ram, GRAPH_RAM_START, GRAPH_RAM_END)?;

        // A generic catch-all for the IO-register page; the timer, joypad
        // and serial tap plugged below each displace their own few bytes
        // of it via `forced_plug`, leaving this to back whatever register
        // this core doesn't model explicitly (and IF, at 0xFF0F).
        let mut registers = Component::create((REGISTERS_END - REGISTERS_START) as usize + 1)?;
        bus.plug(&mut registers, REGISTERS_START, REGISTERS_END)?;

        let mut useless = Component::create((USELESS_END - USELESS_START) as usize + 1)?;
        bus.plug(&mut useless, USELESS_START, USELESS_END)?;

        let mut cpu = Cpu::new()?;
        cpu.plug(&mut bus)?;

        let mut timer = Timer::new()?;
        timer.plug(&mut bus)?;

        let mut cartridge = Cartridge::from_bytes(cartridge_data)?;
        cartridge.plug(&mut bus)?;

        let mut joypad = Joypad::new()?;
        joypad.plug(&mut bus)?;

        let lcd = Lcd::new();

        let serial_tap = if config.serial_tap {
            let mut tap = SerialTap::new()?;
            tap.plug(&mut bus)?;
            Some(tap)
        } else {
            None
        };

        // The boot ROM is plugged last so it shadows the cartridge's
        // bank-ROM0 window until the disable register is written.
        let mut boot_rom = BootRom::new(&config.boot_rom)?;
        boot_rom.plug(&mut bus)?;

        Ok(Gameboy {
            bus,
            cpu,
            timer,
            cartridge,
            boot_rom,
            lcd,
            joypad,
            serial_tap,
            boot: true,
            cycle: 0,
            _work_ram: work_ram,
            _echo_ram: echo_ram,
            _video_ram: video_ram,
            _extern_ram: extern_ram,
            _graph_ram: graph_ram,
            _registers: registers,
            _useless: useless,
        })
    }

    /// The CPU's register file, for host introspection.
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// A mutable view of the CPU, for a host that wants to skip the boot
    /// ROM by jumping straight to the cartridge entry point.
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// A mutable view of the bus, for a host reading/writing memory
    /// directly (e.g. a debugger).
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// A mutable view of the joypad, for a host forwarding key events.
    pub fn joypad_mut(&mut self) -> &mut Joypad {
        &mut self.joypad
    }

    /// The LCD's cycle counter, for a host-side renderer to schedule
    /// against.
    pub fn lcd(&self) -> &Lcd {
        &self.lcd
    }

    /// The number of machine cycles run so far.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Runs one machine cycle: ticks the timer, the CPU, and the LCD, then
    /// notifies every peripheral of the CPU's store (if any) this cycle.
    pub fn step(&mut self) -> GbResult<()> {
        self.timer.tick(&mut self.bus)?;
        self.cpu.tick(&mut self.bus)?;
        self.lcd.tick();

        let write_addr = self.cpu.write_listener();

        // Listener order per the design notes: timer, bootrom, the optional
        // debug serial port, lcd, joypad.
        self.timer.on_write(&mut self.bus, write_addr)?;

        if self.boot && write_addr == REG_BOOT_ROM_DISABLE {
            self.boot_rom.unplug(&mut self.bus);
            self.cartridge.plug(&mut self.bus)?;
            self.boot = false;
            info!("gameboy: boot rom disabled, handing control to the cartridge");
        }

        if let Some(tap) = self.serial_tap.as_mut() {
            tap.on_write(&mut self.bus, write_addr)?;
        }
        self.lcd.on_write(&mut self.bus, write_addr)?;
        self.joypad.on_write(&mut self.bus, write_addr)?;

        self.cycle = self.cycle.wrapping_add(1);
        Ok(())
    }

    /// Runs machine cycles until [`Gameboy::cycle`] reaches `target_cycle`,
    /// stopping early on the first error a peripheral or the CPU raises.
    pub fn run_until(&mut self, target_cycle: usize) -> GbResult<()> {
        while self.cycle < target_cycle {
            self.step()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::cartridge::consts::ROM_CARTRIDGE_TYPE;

    fn blank_cartridge() -> std::vec::Vec<u8> {
        let mut rom = std::vec![0u8; crate::bus::cartridge::BANK_ROM_SIZE];
        rom[ROM_CARTRIDGE_TYPE] = 0;
        rom
    }

    #[test]
    fn test_boot_rom_shadows_cartridge_until_disabled() {
        let mut rom = blank_cartridge();
        rom[0] = 0xAB; // distinguishable from the all-zero boot rom
        let gb = Gameboy::new(&rom, &Config::default()).unwrap();
        assert_eq!(gb.bus.read(0x0000), 0x00); // boot rom's own byte, not the cartridge's
    }

    #[test]
    fn test_disabling_boot_rom_uncovers_cartridge() {
        use crate::cpu::registers::Reg8;

        let mut rom = blank_cartridge();
        rom[0] = 0xAB;

        // LD (0xFF50),A: a minimal "boot rom" that disables itself on its
        // very first instruction.
        let mut boot_rom = [0u8; 0x100];
        boot_rom[0] = 0xEA;
        boot_rom[1] = 0x50;
        boot_rom[2] = 0xFF;
        let config = Config { boot_rom, serial_tap: false };

        let mut gb = Gameboy::new(&rom, &config).unwrap();
        gb.cpu_mut().registers_mut().set8(Reg8::A, 1);

        gb.step().unwrap();

        assert!(!gb.boot);
        assert_eq!(gb.bus.read(0x0000), 0xAB);
    }

    #[test]
    fn test_run_until_advances_cycle_counter() {
        let rom = blank_cartridge();
        let mut gb = Gameboy::new(&rom, &Config::default()).unwrap();
        gb.run_until(10).unwrap();
        assert_eq!(gb.cycle(), 10);
    }
}
