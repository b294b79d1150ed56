use std::{io::Read, path::PathBuf};

use anyhow::{anyhow, Error};

use clap::Parser;

use npio_core::{io, Array, Format, Npz};

/// Print a summary of an npy or npz file.
#[derive(Debug, Parser)]
pub struct Inspect {
    /// Input npy or npz file.
    #[clap(value_parser, value_name = "PATH")]
    pub path: PathBuf,
}

impl Inspect {
    pub fn run(self) -> Result<(), Error> {
        let mut bytes = Vec::new();
        io::open(&self.path)?.read_to_end(&mut bytes)?;

        match Format::detect(&bytes) {
            Some(Format::Npy) => {
                let array = Array::read_npy(&bytes[..])?;
                print_array(None, &array);
            }
            Some(Format::Npz) => {
                let npz = Npz::read(std::io::Cursor::new(bytes))?;
                log::info!("archive with {} members", npz.len());

                for (name, array) in npz.iter() {
                    print_array(Some(name), array);
                }
            }
            None => {
                return Err(anyhow!(
                    "{} is neither an npy nor an npz file",
                    self.path.display()
                ));
            }
        }

        Ok(())
    }
}

fn print_array(name: Option<&str>, array: &Array) {
    let order = if array.order().is_fortran() {
        "column-major"
    } else {
        "row-major"
    };

    match name {
        Some(name) => println!(
            "{name}: shape {}, descr {}, {order}, {} records",
            array.shape(),
            array.descr(),
            array.elements()
        ),
        None => println!(
            "shape {}, descr {}, {order}, {} records",
            array.shape(),
            array.descr(),
            array.elements()
        ),
    }
}
