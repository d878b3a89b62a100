//! Readers and writers for norm-conserving pseudopotential files.

mod cursor;
pub use cursor::*;

mod tag;
pub use tag::*;

mod xccode;
pub use xccode::*;

mod element;
pub use element::*;

mod fhi;
pub use fhi::*;

mod abinit;
pub use abinit::*;

mod upf;
pub use upf::UpfCodec;

mod upf2;
pub use upf2::Upf2Codec;

mod dispatch;
pub use dispatch::*;

use pspdata::{Format, PspData};
use psperror::{PspError, Result};

use log::info;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

pub trait PspCodec {
    /// Builds a fresh dataset from the stream; `hint` is the format the
    /// caller asked for, or `Format::Unknown` during detection.
    fn read(&self, cur: &mut LineCursor, hint: Format) -> Result<PspData>;

    fn write(&self, w: &mut dyn Write, psp: &PspData, format: Format) -> Result<()>;
}

pub fn new(format: Format) -> Result<Box<dyn PspCodec>> {
    let codec: Box<dyn PspCodec>;

    match format {
        Format::Unknown => {
            return Err(PspError::invalid("no codec for an unknown format"));
        }

        Format::Abinit(_) => {
            codec = Box::new(AbinitCodec::new());
        }

        Format::Fhi => {
            codec = Box::new(FhiCodec::new());
        }

        Format::Upf => {
            codec = Box::new(UpfCodec::new());
        }

        Format::Upf2 => {
            codec = Box::new(Upf2Codec::new());
        }
    }

    Ok(codec)
}

/// `Format::Unknown` runs format detection.
pub fn read_dataset<R: Read>(reader: R, hint: Format) -> Result<PspData> {
    let lines = LineCursor::from_reader(reader)?;

    Dispatcher::new().read(&lines, hint)
}

pub fn write_dataset(writer: &mut dyn Write, psp: &PspData, format: Format) -> Result<()> {
    let codec = new(format)?;

    codec.write(writer, psp, format)
}

pub fn read_file<P: AsRef<Path>>(path: P, hint: Format) -> Result<PspData> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let psp = read_dataset(BufReader::new(file), hint)?;
    info!("{}: read as {}", path.display(), psp.get_format_guessed());

    Ok(psp)
}

pub fn write_file<P: AsRef<Path>>(path: P, psp: &PspData, format: Format) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    write_dataset(&mut writer, psp, format)?;
    writer.flush()?;

    info!("{}: written as {}", path.display(), format);

    Ok(())
}
