// Copyright 2021 Nir H. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
//! A minimal command-line host for the gameboy-core library: loads a
//! cartridge and runs it until the core reports an error or the process is
//! killed. No rendering, no input — see [`gameboy_core::bus::lcd`] and
//! [`gameboy_core::bus::joypad`] for the hooks a fuller host would drive.

extern crate gameboy_core;

use std::env;
use std::fmt;
use std::fs;
use std::process;

use gameboy_core::config::Config;
use gameboy_core::gameboy::Gameboy;
use gameboy_core::GameboyError;

enum CliError {
    Std(std::io::Error),
    Gameboy(GameboyError),
    Usage,
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Std(e)
    }
}

impl From<GameboyError> for CliError {
    fn from(e: GameboyError) -> Self {
        CliError::Gameboy(e)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CliError::Std(ref err) => err.fmt(f),
            CliError::Gameboy(ref err) => err.fmt(f),
            CliError::Usage => write!(f, "usage: gb-run <cartridge-file>"),
        }
    }
}

fn run() -> Result<(), CliError> {
    let args: Vec<String> = env::args().collect();
    let rom_fname = args.get(1).ok_or(CliError::Usage)?;

    let rom = fs::read(rom_fname)?;
    let mut gb = Gameboy::new(&rom, &Config::default())?;

    loop {
        gb.step()?;
    }
}

fn main() {
    if let Err(err) = run() {
        println!("gb-run: {:?}", err);
        process::exit(1);
    }
}
