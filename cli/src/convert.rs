use std::{io::Read, path::PathBuf};

use anyhow::{anyhow, Error};

use clap::{Parser, ValueEnum};

use npio_core::{io, Array, Endian, Format, Npz};

/// Convert the byte order of every field of an npy or npz file.
#[derive(Debug, Parser)]
pub struct Convert {
    /// Input npy or npz file.
    #[clap(value_parser, value_name = "PATH")]
    pub input: PathBuf,

    /// Output path.
    #[clap(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,

    /// Target byte order.
    // default_value_t does not work here since ValueEnum variants are not
    // formatted with Display
    #[clap(short = 'e', long, value_enum, default_value = "native")]
    pub endian: Target,
}

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
pub enum Target {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
    /// The byte order of this machine.
    Native,
    /// The byte order opposite to this machine.
    Opposite,
}

impl From<Target> for Endian {
    fn from(target: Target) -> Self {
        match target {
            Target::Little => Endian::Little,
            Target::Big => Endian::Big,
            Target::Native => Endian::NATIVE,
            Target::Opposite => Endian::OPPOSITE,
        }
    }
}

impl Convert {
    pub fn run(self) -> Result<(), Error> {
        let target = Endian::from(self.endian);

        let mut bytes = Vec::new();
        io::open(&self.input)?.read_to_end(&mut bytes)?;

        match Format::detect(&bytes) {
            Some(Format::Npy) => {
                let mut array = Array::read_npy(&bytes[..])?;
                array.convert_to(target);
                array.write_npy(io::create(&self.output)?)?;

                log::info!(
                    "converted {} records to {target:?} byte order",
                    array.elements()
                );
            }
            Some(Format::Npz) => {
                let mut npz = Npz::read(std::io::Cursor::new(bytes))?;

                let names: Vec<String> = npz.names().map(str::to_string).collect();
                for name in names {
                    if let Some(array) = npz.get_mut(&name) {
                        array.convert_to(target);
                    }
                }

                npz.write_path(&self.output)?;

                log::info!("converted {} members to {target:?} byte order", npz.len());
            }
            None => {
                return Err(anyhow!(
                    "{} is neither an npy nor an npz file",
                    self.input.display()
                ));
            }
        }

        Ok(())
    }
}
