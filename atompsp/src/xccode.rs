//! Native exchange-correlation encodings and their canonical (exchange,
//! correlation) pairs of libxc identifiers.

use psperror::{PspError, Result};

pub trait XcConvention {
    type Code;

    fn to_canonical(&self, code: &Self::Code) -> Result<(i32, i32)>;
    fn from_canonical(&self, exchange: i32, correlation: i32) -> Result<Self::Code>;
}

/// abinit `pspxc`: positive values are abinit `ixc` codes, negative values
/// pack a libxc pair as `-(exchange * 1000 + correlation)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbinitXc;

const ABINIT_IXC: [(i32, (i32, i32)); 5] = [
    (0, (0, 0)),
    (1, (20, 0)),
    (2, (1, 9)),
    (7, (1, 12)),
    (11, (101, 130)),
];

impl XcConvention for AbinitXc {
    type Code = i32;

    fn to_canonical(&self, code: &i32) -> Result<(i32, i32)> {
        let code = *code;

        if code < 0 {
            return Ok((-code / 1000, -code % 1000));
        }

        ABINIT_IXC
            .iter()
            .find(|(ixc, _)| *ixc == code)
            .map(|(_, pair)| *pair)
            .ok_or_else(|| PspError::unsupported(format!("abinit ixc {}", code)))
    }

    fn from_canonical(&self, exchange: i32, correlation: i32) -> Result<i32> {
        if let Some((ixc, _)) = ABINIT_IXC
            .iter()
            .find(|(_, pair)| *pair == (exchange, correlation))
        {
            return Ok(*ixc);
        }

        if exchange < 0 || !(0..1000).contains(&correlation) {
            return Err(PspError::unsupported(format!(
                "xc pair ({}, {}) cannot be packed for abinit",
                exchange, correlation
            )));
        }

        Ok(-(exchange * 1000 + correlation))
    }
}

/// UPF functional strings, e.g. `SLA PW PBX PBC` or the short name `PBE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpfXc;

// (four-word string, short name, pair)
const UPF_FUNCTIONALS: [(&str, &str, (i32, i32)); 7] = [
    ("SLA PZ NOGX NOGC", "PZ", (1, 9)),
    ("SLA PW NOGX NOGC", "PW", (1, 12)),
    ("SLA PW PBX PBC", "PBE", (101, 130)),
    ("SLA PW PSX PSC", "PBESOL", (116, 133)),
    ("SLA B88 LYP BLYP", "BLYP", (106, 131)),
    ("SLA PW PBE PBE", "PBE", (101, 130)),
    ("NOX NOC NOGX NOGC", "NONE", (0, 0)),
];

fn lookup(words: &str) -> Option<(i32, i32)> {
    UPF_FUNCTIONALS
        .iter()
        .find(|(long, short, _)| *long == words || *short == words)
        .map(|(_, _, pair)| *pair)
}

impl XcConvention for UpfXc {
    type Code = String;

    fn to_canonical(&self, code: &String) -> Result<(i32, i32)> {
        let words: Vec<String> = code.split_whitespace().map(|w| w.to_uppercase()).collect();

        if words.is_empty() {
            return Err(PspError::corrupt("empty UPF functional"));
        }

        // whole string, then the four-word form, then a lone short name
        lookup(&words.join(" "))
            .or_else(|| lookup(&words.iter().take(4).cloned().collect::<Vec<_>>().join(" ")))
            .or_else(|| lookup(&words[0]))
            .ok_or_else(|| PspError::unsupported(format!("UPF functional '{}'", code.trim())))
    }

    fn from_canonical(&self, exchange: i32, correlation: i32) -> Result<String> {
        UPF_FUNCTIONALS
            .iter()
            .find(|(_, _, pair)| *pair == (exchange, correlation))
            .map(|(long, _, _)| long.to_string())
            .ok_or_else(|| {
                PspError::unsupported(format!(
                    "xc pair ({}, {}) has no UPF name",
                    exchange, correlation
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abinit_packed_roundtrip() {
        let xc = AbinitXc;

        let code = xc.from_canonical(106, 131).unwrap();
        assert_eq!(code, -106131);
        assert_eq!(xc.to_canonical(&code).unwrap(), (106, 131));
    }

    #[test]
    fn test_abinit_native_codes() {
        let xc = AbinitXc;

        assert_eq!(xc.to_canonical(&11).unwrap(), (101, 130));
        assert_eq!(xc.from_canonical(101, 130).unwrap(), 11);
        assert_eq!(xc.to_canonical(&1).unwrap(), (20, 0));
        assert!(matches!(xc.to_canonical(&3), Err(PspError::Unsupported(_))));
    }

    #[test]
    fn test_upf_names() {
        let xc = UpfXc;

        assert_eq!(xc.to_canonical(&" SLA  PW   PBX  PBC ".to_string()).unwrap(), (101, 130));
        assert_eq!(xc.to_canonical(&"pbe".to_string()).unwrap(), (101, 130));
        assert_eq!(xc.to_canonical(&"SLA PZ NOGX NOGC PZ".to_string()).unwrap(), (1, 9));
        assert!(xc.to_canonical(&"HSE".to_string()).is_err());

        assert_eq!(xc.from_canonical(1, 12).unwrap(), "SLA PW NOGX NOGC");
        assert!(xc.from_canonical(999, 999).is_err());
    }
}
