use std::path::PathBuf;

use anyhow::Error;

use clap::Parser;

use npio_core::Npz;

/// Unpack an npz archive into individual npy files.
#[derive(Debug, Parser)]
pub struct Unpack {
    /// Input npz file.
    #[clap(value_parser, value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory.
    ///
    /// Defaults to the current directory. Each member is written as
    /// `<name>.npy`.
    #[clap(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,
}

impl Unpack {
    pub fn run(self) -> Result<(), Error> {
        let npz = Npz::read_path(&self.input)?;

        for (name, array) in npz.iter() {
            let path = self.outdir.join(format!("{name}.npy"));

            log::info!("unpacking '{name}' to {}", path.display());

            array.write_npy(npio_core::io::create(&path)?)?;
        }

        log::info!("unpacked {} members", npz.len());

        Ok(())
    }
}
