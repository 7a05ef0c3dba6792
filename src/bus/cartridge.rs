// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! The game cartridge. Only the "no-mapper" cartridge type (a plain 32 KiB
//! ROM occupying the whole bank-ROM window) is supported; bank-switching
//! mappers are a non-goal of this core.

use crate::bus::consts::{BANK_ROM0_START, BANK_ROM1_END};
use crate::bus::Bus;
use crate::memory::Component;
use crate::GameboyError;
use crate::GbResult;

/// Cartridge header field addresses.
#[allow(missing_docs)]
pub mod consts {
    /// Cartridge type byte: must be 0 ("ROM only") for this core.
    pub const ROM_CARTRIDGE_TYPE: usize = 0x0147;
}

use consts::*;

/// The full size of the no-mapper cartridge's ROM window.
pub const BANK_ROM_SIZE: usize = 0x8000;

/// A loaded, no-mapper cartridge image.
pub struct Cartridge {
    component: Component,
}

impl Cartridge {
    /// Builds a cartridge from `data`, the raw bytes of a cartridge file.
    ///
    /// Fails with [`GameboyError::Io`] if `data` is shorter than
    /// [`BANK_ROM_SIZE`], or with [`GameboyError::NotImplemented`] if the
    /// cartridge type byte at 0x147 names anything but a plain ROM.
    pub fn from_bytes(data: &[u8]) -> GbResult<Cartridge> {
        if data.len() < BANK_ROM_SIZE {
            return Err(GameboyError::Io("cartridge file is smaller than one ROM bank"));
        }
        if data[ROM_CARTRIDGE_TYPE] != 0 {
            return Err(GameboyError::NotImplemented(
                "only the no-mapper cartridge type is supported",
            ));
        }

        let component = Component::create(BANK_ROM_SIZE)?;
        component
            .memory
            .as_ref()
            .expect("just-created component is always backed")
            .borrow_mut()
            .load(0, &data[..BANK_ROM_SIZE]);

        Ok(Cartridge { component })
    }

    /// Force-plugs the cartridge over the bank-ROM address range,
    /// displacing the boot ROM's mapping if it is still present.
    pub fn plug(&mut self, bus: &mut Bus) -> GbResult<()> {
        bus.forced_plug(&mut self.component, BANK_ROM0_START, BANK_ROM1_END, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_type(cartridge_type: u8) -> [u8; BANK_ROM_SIZE] {
        let mut rom = [0u8; BANK_ROM_SIZE];
        rom[ROM_CARTRIDGE_TYPE] = cartridge_type;
        rom
    }

    #[test]
    fn test_rejects_too_small_image() {
        assert!(Cartridge::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_rejects_mbc_cartridge_type() {
        let rom = rom_with_type(1);
        assert!(Cartridge::from_bytes(&rom).is_err());
    }

    #[test]
    fn test_plug_maps_whole_bank_rom_window() {
        let mut rom = rom_with_type(0);
        rom[0] = 0xAB;
        rom[BANK_ROM_SIZE - 1] = 0xCD;

        let mut cart = Cartridge::from_bytes(&rom).unwrap();
        let mut bus = Bus::new();
        cart.plug(&mut bus).unwrap();

        assert_eq!(bus.read(BANK_ROM0_START), 0xAB);
        assert_eq!(bus.read(BANK_ROM1_END), 0xCD);
    }
}
