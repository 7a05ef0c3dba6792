// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The boot ROM overlay: 256 fixed bytes mapped over the low address range
//! until a write to the disable register hands control to the cartridge.

use crate::bus::Bus;
use crate::config::BootRomImage;
use crate::memory::Component;
use crate::GbResult;

/// The boot ROM disable register. A write here while the boot ROM is still
/// mapped unmaps it and force-plugs the cartridge over the bank-ROM range.
pub const REG_BOOT_ROM_DISABLE: u16 = 0xFF50;

const BOOT_ROM_START: u16 = 0x0000;
const BOOT_ROM_END: u16 = 0x00FF;

/// The boot ROM component.
pub struct BootRom {
    component: Component,
}

impl BootRom {
    /// Creates a boot ROM backed by `image`.
    pub fn new(image: &BootRomImage) -> GbResult<BootRom> {
        let component = Component::create(image.len())?;
        component
            .memory
            .as_ref()
            .expect("just-created component is always backed")
            .borrow_mut()
            .load(0, image);
        Ok(BootRom { component })
    }

    /// Plugs the boot ROM over the low address range, last in the
    /// construction order so it shadows the cartridge's own bank-ROM0.
    pub fn plug(&mut self, bus: &mut Bus) -> GbResult<()> {
        bus.forced_plug(&mut self.component, BOOT_ROM_START, BOOT_ROM_END, 0)
    }

    /// Unplugs the boot ROM, uncovering whatever is mapped beneath it.
    pub fn unplug(&mut self, bus: &mut Bus) {
        bus.unplug(&mut self.component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_rom_shadows_underlying_mapping() {
        let mut bus = Bus::new();
        let mut cartridge = Component::create(0x100).unwrap();
        bus.plug(&mut cartridge, BOOT_ROM_START, BOOT_ROM_END).unwrap();
        bus.write(0x0000, 0xAA).unwrap();

        let mut image = [0u8; 0x100];
        image[0] = 0x11;
        let mut boot_rom = BootRom::new(&image).unwrap();
        boot_rom.plug(&mut bus).unwrap();

        assert_eq!(bus.read(0x0000), 0x11);

        boot_rom.unplug(&mut bus);
        assert_eq!(bus.read(0x0000), 0xFF);
    }
}
