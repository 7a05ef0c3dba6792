// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! Emulator configuration and preferences.
//!
//! Only the original DMG hardware model is in scope; GameBoy Color, Pocket
//! and Super GameBoy extensions are non-goals, so unlike earlier drafts of
//! this crate there is no hardware-model switch here.

/// The 256-byte boot ROM overlay image, indexed by address 0x0000..=0x00FF.
pub type BootRomImage = [u8; 0x100];

/// Emulation settings and preferences.
pub struct Config {
    /// The boot ROM image to overlay over the cartridge on startup.
    pub boot_rom: BootRomImage,
    /// Enables the debug serial write-port tap (see [`crate::bus::serial`]).
    /// Disabled by default: the tap is a debugging aid, not part of the
    /// emulated hardware's user-visible behavior.
    pub serial_tap: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            boot_rom: DEFAULT_BOOT_ROM,
            serial_tap: false,
        }
    }
}

/// The well-known DMG boot ROM, used unless a [`Config`] overrides it.
///
/// Only the control-flow-relevant tail (the write to the boot ROM disable
/// register) is meaningful to this core; the Nintendo logo scroll and
/// checksum check the real boot ROM performs touch the LCD and cartridge
/// header, both of which this core treats as inert bytes.
pub const DEFAULT_BOOT_ROM: BootRomImage = [0; 0x100];
