use crate::cursor::LineCursor;
use crate::{AbinitCodec, FhiCodec, PspCodec, Upf2Codec, UpfCodec};
use pspdata::{Format, PspData};
use psperror::{PspError, Result};

use log::{debug, info};
use std::{fmt, str::FromStr};

/// Reader families tried by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Upf,
    Upf2,
    Abinit,
    Fhi,
}

impl Family {
    pub fn codec(&self) -> Box<dyn PspCodec> {
        match self {
            Family::Upf => Box::new(UpfCodec::new()),
            Family::Upf2 => Box::new(Upf2Codec::new()),
            Family::Abinit => Box::new(AbinitCodec::new()),
            Family::Fhi => Box::new(FhiCodec::new()),
        }
    }

    pub fn of(format: Format) -> Option<Family> {
        match format {
            Format::Unknown => None,
            Format::Abinit(_) => Some(Family::Abinit),
            Format::Fhi => Some(Family::Fhi),
            Format::Upf => Some(Family::Upf),
            Format::Upf2 => Some(Family::Upf2),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Family::Upf => "upf",
            Family::Upf2 => "upf2",
            Family::Abinit => "abinit",
            Family::Fhi => "fhi",
        };

        write!(f, "{}", s)
    }
}

impl FromStr for Family {
    type Err = PspError;

    fn from_str(s: &str) -> Result<Family> {
        match s.trim().to_lowercase().as_str() {
            "upf" => Ok(Family::Upf),
            "upf2" => Ok(Family::Upf2),
            "abinit" => Ok(Family::Abinit),
            "fhi" => Ok(Family::Fhi),
            other => Err(PspError::invalid(format!("unknown format family '{}'", other))),
        }
    }
}

/// Tries each reader family in turn until one accepts the input.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    order: Vec<Family>,
}

impl Default for Dispatcher {
    fn default() -> Dispatcher {
        Dispatcher {
            order: vec![Family::Upf, Family::Upf2, Family::Abinit, Family::Fhi],
        }
    }
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    pub fn with_order(order: &[Family]) -> Result<Dispatcher> {
        if order.is_empty() {
            return Err(PspError::invalid("empty reader order"));
        }

        Ok(Dispatcher {
            order: order.to_vec(),
        })
    }

    pub fn get_order(&self) -> &[Family] {
        &self.order
    }

    /// With a known `hint` only that reader runs and its error is returned
    /// as is; otherwise every family gets a fresh copy of the input.
    pub fn read(&self, lines: &LineCursor, hint: Format) -> Result<PspData> {
        if let Some(family) = Family::of(hint) {
            let mut cur = lines.clone();
            cur.rewind();

            return family.codec().read(&mut cur, hint);
        }

        let mut attempts = Vec::with_capacity(self.order.len());

        for family in self.order.iter() {
            let mut cur = lines.clone();
            cur.rewind();

            let result = family
                .codec()
                .read(&mut cur, Format::Unknown)
                .and_then(|psp| psp.validate().map(|_| psp));

            match result {
                Ok(psp) => {
                    info!("detected {} pseudopotential", psp.get_format_guessed());
                    return Ok(psp);
                }

                Err(e) => {
                    debug!("{} reader rejected the input: {}", family, e);
                    attempts.push(format!("{}: {}", family, e));
                }
            }
        }

        Err(PspError::UnrecognizedFormat { attempts })
    }
}
