use std::path::{Path, PathBuf};

use anyhow::{anyhow, Error};

use clap::Parser;

use npio_core::{io, Array, Npz};

/// Pack npy files into an npz archive.
#[derive(Debug, Parser)]
pub struct Pack {
    /// Input npy files.
    ///
    /// Each file becomes an archive member named after its file stem.
    #[clap(value_parser, value_name = "PATH", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output npz path.
    #[clap(short = 'o', long, value_name = "PATH")]
    pub output: PathBuf,
}

impl Pack {
    pub fn run(self) -> Result<(), Error> {
        let mut npz = Npz::new();

        for input in &self.inputs {
            let name = member_name(input)?;
            let array = Array::read_npy(io::open(input)?)?;

            log::info!("packing {} as '{name}'", input.display());

            if npz.insert(name.clone(), array).is_some() {
                return Err(anyhow!("duplicate member name '{name}'"));
            }
        }

        npz.write_path(&self.output)?;

        log::info!(
            "wrote {} members to {}",
            npz.len(),
            self.output.display()
        );

        Ok(())
    }
}

fn member_name(path: &Path) -> Result<String, Error> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive a member name from {}", path.display()))
}
