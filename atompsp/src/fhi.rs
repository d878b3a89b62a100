use crate::cursor::{fields, parse_f64, parse_int, sci, LineCursor};
use crate::PspCodec;
use pspconsts::FOURPI;
use pspdata::*;
use psperror::{try_alloc, PspError, Result};

use log::debug;
use std::io::Write;

/// Lines between the header and the first channel block.
const FHI_SKIPPED_LINES: usize = 10;

/// Everything an fhi98pp body holds. Also the tail of an abinit-6 file.
#[derive(Debug)]
pub struct FhiBody {
    pub zvalence: f64,
    pub mesh: Mesh,
    pub states: Vec<State>,
    pub potentials: Vec<Potential>,
    /// core density, already divided by 4 pi
    pub core_density: Option<Vec<f64>>,
}

impl FhiBody {
    pub fn read(cur: &mut LineCursor) -> Result<FhiBody> {
        let line = cur.expect_line("fhi header")?;
        let tokens = fields(&line, 2, "fhi header")?;
        let zvalence = parse_f64(tokens[0])?;
        let nchan: usize = parse_int(tokens[1])?;

        if nchan == 0 {
            return Err(PspError::corrupt("fhi file declares no channels"));
        }

        cur.skip_lines(FHI_SKIPPED_LINES, "fhi header")?;

        let mut radii: Vec<f64> = Vec::new();
        let mut channels = Vec::new();

        for l in 0..nchan {
            let what = format!("fhi channel l = {}", l);

            let line = cur.expect_line(&what)?;
            let tokens = fields(&line, 2, &what)?;
            let np: usize = parse_int(tokens[0])?;
            parse_f64(tokens[1])?;

            if l == 0 {
                if np > cur.remaining() {
                    return Err(PspError::malformed(format!(
                        "{}: {} points declared, {} lines left",
                        what,
                        np,
                        cur.remaining()
                    )));
                }
            } else if np != radii.len() {
                return Err(PspError::inconsistent(format!(
                    "{} has {} points, channel 0 has {}",
                    what,
                    np,
                    radii.len()
                )));
            }

            let mut r = try_alloc::<f64>(np)?;
            let mut u = try_alloc::<f64>(np)?;
            let mut v = try_alloc::<f64>(np)?;

            for _ in 0..np {
                let line = cur.expect_line(&what)?;
                let tokens = fields(&line, 4, &what)?;

                r.push(parse_f64(tokens[1])?);
                u.push(parse_f64(tokens[2])?);
                v.push(parse_f64(tokens[3])?);
            }

            if l == 0 {
                radii = r;
            }

            channels.push((u, v));
        }

        let mesh = Mesh::from_points(&radii, None)?;
        debug!("fhi mesh: {}", mesh);

        let mut states = Vec::with_capacity(nchan);
        let mut potentials = Vec::with_capacity(nchan);

        for (l, (u, v)) in channels.iter().enumerate() {
            let qn = QuantumNumber::scalar(0, l);

            states.push(State::new(&qn.label(), qn, 0.0, 0.0, &mesh, u)?);
            potentials.push(Potential::new(qn, &mesh, v)?);
        }

        let core_density = if cur.has_more_data() {
            let np = mesh.get_np();
            let mut rho = try_alloc::<f64>(np)?;

            for _ in 0..np {
                let line = cur.expect_line("fhi core density")?;
                let tokens = fields(&line, 4, "fhi core density")?;

                rho.push(parse_f64(tokens[1])? / FOURPI);
            }

            Some(rho)
        } else {
            None
        };

        Ok(FhiBody {
            zvalence,
            mesh,
            states,
            potentials,
            core_density,
        })
    }

    /// Write the body of `psp`: one channel per l up to `l_max`, then the
    /// core block if the dataset carries a tabulated core density.
    pub fn write(w: &mut dyn Write, psp: &PspData) -> Result<()> {
        let mesh = psp.mesh()?;
        let r = mesh.get_rad();
        let nchan = psp.get_l_max() + 1;

        if psp.get_xc().has_nlcc() && psp.get_xc().get_core_density().is_none() {
            return Err(PspError::invalid(
                "fhi core correction needs a tabulated core density",
            ));
        }

        writeln!(w, "{}   {}", sci(psp.get_zvalence(), 14), nchan)?;
        writeln!(w, "  0.0000    0.0000    0.0000   0.0000")?;
        for _ in 1..FHI_SKIPPED_LINES {
            writeln!(w, "  0.0000    .00e+00   .00e+00")?;
        }

        for l in 0..nchan {
            let v = psp.potential_for(l, 0.0).ok_or_else(|| {
                PspError::invalid(format!("fhi needs a semi-local potential for l = {}", l))
            })?;

            let state = psp
                .get_states()
                .iter()
                .find(|s| s.get_qn().get_l() == l)
                .ok_or_else(|| {
                    PspError::invalid(format!("fhi needs a wavefunction for l = {}", l))
                })?;

            writeln!(w, "{:<4} {}", mesh.get_np(), sci(r[1] / r[0], 14))?;

            for (i, &ri) in r.iter().enumerate() {
                writeln!(
                    w,
                    "{:4} {} {} {}",
                    i + 1,
                    sci(ri, 14),
                    sci(state.wf_eval(ri), 14),
                    sci(v.eval(ri), 14)
                )?;
            }
        }

        if let Some(rho) = psp.get_xc().get_core_density() {
            for &ri in r.iter() {
                writeln!(
                    w,
                    "{} {} {} {}",
                    sci(ri, 14),
                    sci(FOURPI * rho.eval(ri), 14),
                    sci(FOURPI * rho.eval_deriv(ri), 14),
                    sci(FOURPI * rho.eval_deriv2(ri), 14)
                )?;
            }
        }

        Ok(())
    }
}

pub struct FhiCodec {}

impl FhiCodec {
    pub fn new() -> FhiCodec {
        FhiCodec {}
    }
}

impl PspCodec for FhiCodec {
    fn read(&self, cur: &mut LineCursor, _hint: Format) -> Result<PspData> {
        let body = FhiBody::read(cur)?;

        let mut psp = PspData::new();

        psp.set_format_guessed(Format::Fhi);
        psp.set_zvalence(body.zvalence);
        psp.set_l_max(body.potentials.len() - 1);
        psp.set_scheme(Scheme::TroullierMartins);

        // the functional is not recorded in fhi files
        let mut xc = Xc::new(0, 0);
        if let Some(rho) = body.core_density.as_ref() {
            xc.set_nlcc(Some(Nlcc::new(NlccScheme::Fhi).with_density(&body.mesh, rho)?));
        }
        psp.set_xc(xc);

        psp.set_states(body.states);
        psp.set_potentials(body.potentials);
        psp.set_mesh(body.mesh);

        Ok(psp)
    }

    fn write(&self, w: &mut dyn Write, psp: &PspData, _format: Format) -> Result<()> {
        FhiBody::write(w, psp)
    }
}
