use crate::cursor::{fields, parse_f64, parse_int, sci, LineCursor};
use crate::fhi::FhiBody;
use crate::xccode::{AbinitXc, XcConvention};
use crate::PspCodec;
use integral::simpson_rab;
use pspconsts::{EPS10, FOURPI, NLCC_FCHRG_THRESHOLD};
use pspdata::*;
use psperror::{try_alloc, PspError, Result};

use chrono::{Local, NaiveDate};
use log::{debug, warn};
use std::io::Write;

/// Lines 1-4 of every abinit pseudopotential file.
#[derive(Debug, Clone, PartialEq)]
pub struct AbinitHeader {
    pub title: String,
    pub z: f64,
    pub zvalence: f64,
    pub pspdat: Option<NaiveDate>,
    pub pspcod: u32,
    pub pspxc: i32,
    pub lmax: usize,
    pub lloc: usize,
    pub mmax: usize,
    pub r2well: f64,
    /// (rchrg, fchrg, qchrg); `None` when line 4 is the `4--` comment
    pub core: Option<(f64, f64, f64)>,
}

impl AbinitHeader {
    pub fn read(cur: &mut LineCursor) -> Result<AbinitHeader> {
        let title = cur.expect_line("abinit title")?.trim().to_string();

        let line = cur.expect_line("abinit line 2")?;
        let tokens = fields(&line, 2, "zatom, zion")?;
        let z = parse_f64(tokens[0])?;
        let zvalence = parse_f64(tokens[1])?;
        let pspdat = tokens
            .get(2)
            .and_then(|d| NaiveDate::parse_from_str(d, "%y%m%d").ok());

        let line = cur.expect_line("abinit line 3")?;
        let tokens = fields(&line, 6, "pspcod, pspxc, lmax, lloc, mmax, r2well")?;
        let pspcod: u32 = parse_int(tokens[0])?;
        let pspxc: i32 = parse_int(tokens[1])?;
        let lmax: usize = parse_int(tokens[2])?;
        let lloc: usize = parse_int(tokens[3])?;
        let mmax: usize = parse_int(tokens[4])?;
        let r2well = parse_f64(tokens[5])?;

        let line = cur.expect_line("abinit line 4")?;
        let core = if line.starts_with("4--") {
            None
        } else {
            let tokens = fields(&line, 3, "rchrg, fchrg, qchrg")?;

            Some((
                parse_f64(tokens[0])?,
                parse_f64(tokens[1])?,
                parse_f64(tokens[2])?,
            ))
        };

        Ok(AbinitHeader {
            title,
            z,
            zvalence,
            pspdat,
            pspcod,
            pspxc,
            lmax,
            lloc,
            mmax,
            r2well,
            core,
        })
    }

    /// Header describing `psp` as an abinit file of code `pspcod`.
    pub fn from_dataset(psp: &PspData, pspcod: u32) -> Result<AbinitHeader> {
        let (exchange, correlation) = psp.get_xc().get_pair();
        let pspxc = AbinitXc.from_canonical(exchange, correlation)?;

        let lmax = psp.get_l_max();
        let lloc = psp.get_l_local().unwrap_or_else(|| (lmax + 1).max(4));

        let core = match psp.get_xc().get_nlcc() {
            Some(nlcc) => match nlcc.get_prefactors() {
                Some((rchrg, fchrg, qchrg)) if fchrg.abs() >= NLCC_FCHRG_THRESHOLD => {
                    Some((rchrg, fchrg, qchrg))
                }
                Some((_, fchrg, _)) => {
                    return Err(PspError::invalid(format!(
                        "core correction with fchrg = {} cannot be flagged in an abinit header",
                        fchrg
                    )));
                }
                None => Some(core_from_density(nlcc)?),
            },
            None => Some((0.0, 0.0, 0.0)),
        };

        let title = psp.get_info().lines().next().unwrap_or("").trim().to_string();

        Ok(AbinitHeader {
            title: if title.is_empty() {
                psp.get_symbol().to_string()
            } else {
                title
            },
            z: psp.get_z(),
            zvalence: psp.get_zvalence(),
            pspdat: psp.get_pspinfo().date,
            pspcod,
            pspxc,
            lmax,
            lloc,
            mmax: psp.mesh()?.get_np(),
            r2well: 0.0,
            core,
        })
    }

    pub fn has_nlcc(&self) -> bool {
        match self.core {
            Some((_, fchrg, _)) => fchrg.abs() >= NLCC_FCHRG_THRESHOLD,
            None => false,
        }
    }

    pub fn format(&self) -> Result<Format> {
        Format::abinit(self.pspcod)
    }

    pub fn xc(&self) -> Result<(i32, i32)> {
        AbinitXc.to_canonical(&self.pspxc)
    }

    pub fn l_local(&self) -> Option<usize> {
        if self.lloc <= self.lmax {
            Some(self.lloc)
        } else {
            None
        }
    }

    pub fn write(&self, w: &mut dyn Write) -> Result<()> {
        let date = self
            .pspdat
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%y%m%d");

        writeln!(w, "{}", self.title)?;
        writeln!(
            w,
            "{:16.10} {:16.10}   {}   zatom, zion, pspdat",
            self.z, self.zvalence, date
        )?;
        writeln!(
            w,
            "   {}   {}   {}   {}   {}   {:8.3}   pspcod, pspxc, lmax, lloc, mmax, r2well",
            self.pspcod, self.pspxc, self.lmax, self.lloc, self.mmax, self.r2well
        )?;

        match self.core {
            Some((rchrg, fchrg, qchrg)) => writeln!(
                w,
                "{} {} {}   rchrg, fchrg, qchrg",
                sci(rchrg, 12),
                sci(fchrg, 12),
                sci(qchrg, 12)
            )?,
            None => writeln!(w, "4--- no core correction")?,
        }

        Ok(())
    }

    /// Fields every abinit variant carries.
    fn fill(&self, psp: &mut PspData) -> Result<()> {
        let (exchange, correlation) = self.xc()?;

        psp.set_format_guessed(self.format()?);
        psp.set_info(&self.title);
        psp.set_z(self.z);
        psp.set_zvalence(self.zvalence);
        psp.set_l_max(self.lmax);
        psp.set_l_local(self.l_local());
        psp.set_xc(Xc::new(exchange, correlation));
        psp.set_pspinfo(PspInfo {
            date: self.pspdat,
            ..PspInfo::default()
        });

        Ok(())
    }

    /// Number of angular channels, `lmax + 1`.
    pub fn channels(&self) -> Result<usize> {
        self.lmax
            .checked_add(1)
            .ok_or_else(|| PspError::corrupt(format!("lmax = {} is out of range", self.lmax)))
    }

    fn core_prefactors(&self) -> (f64, f64, f64) {
        self.core.unwrap_or((0.0, 0.0, 0.0))
    }
}

/// Header prefactors of a core correction given only by its tabulated density:
/// rchrg is the outermost radius where the density is non-zero, fchrg = 1 since
/// the density enters unscaled, qchrg is the integrated core charge.
fn core_from_density(nlcc: &Nlcc) -> Result<(f64, f64, f64)> {
    let rho = nlcc.get_density().ok_or_else(|| {
        PspError::invalid("core correction with neither prefactors nor a tabulated density")
    })?;

    let mesh = rho.get_mesh();
    let values = rho.get_values();

    let rchrg = mesh
        .get_rad()
        .iter()
        .zip(values.iter())
        .filter(|(_, v)| v.abs() > EPS10)
        .map(|(&r, _)| r)
        .last()
        .unwrap_or(0.0);

    let integrand: Vec<f64> = mesh
        .get_rad()
        .iter()
        .zip(values.iter())
        .map(|(r, v)| FOURPI * r * r * v)
        .collect();
    let qchrg = simpson_rab(&integrand, mesh.get_rab());

    Ok((rchrg, 1.0, qchrg))
}

/// abinit-6: the fhi98pp file follows the header and three comment lines.
fn read_psp6(cur: &mut LineCursor, header: &AbinitHeader) -> Result<PspData> {
    cur.skip_lines(3, "abinit lines 5-7")?;

    let body = FhiBody::read(cur)?;

    if body.potentials.len() != header.channels()? {
        return Err(PspError::inconsistent(format!(
            "lmax = {} but the fhi body has {} channels",
            header.lmax,
            body.potentials.len()
        )));
    }

    if body.mesh.get_np() != header.mmax {
        return Err(PspError::inconsistent(format!(
            "mmax = {} but the fhi body has {} points",
            header.mmax,
            body.mesh.get_np()
        )));
    }

    let mut psp = PspData::new();
    header.fill(&mut psp)?;
    psp.set_scheme(Scheme::TroullierMartins);

    match (header.has_nlcc(), body.core_density.as_ref()) {
        (true, Some(rho)) => {
            let (rchrg, fchrg, qchrg) = header.core_prefactors();
            let nlcc = Nlcc::new(NlccScheme::Fhi)
                .with_prefactors(rchrg, fchrg, qchrg)
                .with_density(&body.mesh, rho)?;

            psp.get_xc_mut().set_nlcc(Some(nlcc));
        }

        (true, None) => {
            return Err(PspError::inconsistent(
                "fchrg announces a core correction but no core density follows",
            ));
        }

        (false, Some(_)) => warn!("core density ignored since fchrg is zero"),

        (false, None) => {}
    }

    let vlocal = match header.l_local() {
        Some(l) => body.potentials.get(l).cloned(),
        None => None,
    };

    psp.set_vlocal(vlocal);
    psp.set_states(body.states);
    psp.set_potentials(body.potentials);
    psp.set_mesh(body.mesh);

    Ok(psp)
}

fn write_psp6(w: &mut dyn Write, psp: &PspData) -> Result<()> {
    if psp.get_l_local().is_none() {
        return Err(PspError::invalid("abinit-6 needs a local channel"));
    }

    if psp.get_xc().has_nlcc() && psp.get_xc().get_core_density().is_none() {
        return Err(PspError::invalid(
            "abinit-6 core correction needs a tabulated core density",
        ));
    }

    AbinitHeader::from_dataset(psp, 6)?.write(w)?;

    writeln!(w, "5--- These two lines are available for giving more information, later")?;
    writeln!(w, "6")?;
    writeln!(w, "7-Here follows the cpi file from the fhi98pp code-")?;

    FhiBody::write(w, psp)
}

/// Columns of `mmax` lines `i r f_1 .. f_ncol`; returns the radii and the columns.
fn read_columns(
    cur: &mut LineCursor,
    mmax: usize,
    ncol: usize,
    what: &str,
) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
    if mmax > cur.remaining() {
        return Err(PspError::malformed(format!(
            "{}: {} lines declared, {} left",
            what,
            mmax,
            cur.remaining()
        )));
    }

    let mut r = try_alloc::<f64>(mmax)?;
    let mut cols = Vec::with_capacity(ncol);
    for _ in 0..ncol {
        cols.push(try_alloc::<f64>(mmax)?);
    }

    for _ in 0..mmax {
        let line = cur.expect_line(what)?;
        let tokens = fields(&line, 2 + ncol, what)?;

        r.push(parse_f64(tokens[1])?);
        for (col, tok) in cols.iter_mut().zip(tokens[2..].iter()) {
            col.push(parse_f64(tok)?);
        }
    }

    Ok((r, cols))
}

/// abinit-8, the ONCVPSP layout.
fn read_psp8(cur: &mut LineCursor, header: &AbinitHeader) -> Result<PspData> {
    let nchan = header.channels()?;

    let line = cur.expect_line("nproj")?;
    let tokens = fields(&line, nchan, "nproj")?;
    let nproj = tokens[..nchan]
        .iter()
        .map(|t| parse_int::<usize>(t))
        .collect::<Result<Vec<usize>>>()?;

    let line = cur.expect_line("extension_switch")?;
    let extension: u32 = parse_int(fields(&line, 1, "extension_switch")?[0])?;
    if extension > 1 {
        return Err(PspError::unsupported(format!(
            "abinit-8 extension switch {} (spin-orbit)",
            extension
        )));
    }

    let mmax = header.mmax;
    let mut radii: Option<Vec<f64>> = None;
    let mut projectors: Vec<(usize, f64, Vec<f64>)> = Vec::new();
    let mut vlocal: Option<Vec<f64>> = None;

    for l in 0..nchan {
        if nproj[l] > 0 {
            let what = format!("projectors l = {}", l);

            let line = cur.expect_line(&what)?;
            let tokens = fields(&line, 1 + nproj[l], &what)?;
            let ll: usize = parse_int(tokens[0])?;
            if ll != l {
                return Err(PspError::inconsistent(format!(
                    "expected projector block for l = {}, found l = {}",
                    l, ll
                )));
            }

            let ekb = tokens[1..=nproj[l]]
                .iter()
                .map(|t| parse_f64(t))
                .collect::<Result<Vec<f64>>>()?;

            let (r, cols) = read_columns(cur, mmax, nproj[l], &what)?;
            radii.get_or_insert(r);

            for (e, beta) in ekb.into_iter().zip(cols.into_iter()) {
                projectors.push((l, e, beta));
            }
        }

        if l == header.lloc {
            vlocal = Some(read_local_block(cur, header, &mut radii)?);
        }
    }

    if header.lloc > header.lmax {
        vlocal = Some(read_local_block(cur, header, &mut radii)?);
    }

    let core = if header.has_nlcc() {
        let (r, cols) = read_columns(cur, mmax, 5, "model core charge")?;
        radii.get_or_insert(r);

        Some(cols[0].iter().map(|x| x / FOURPI).collect::<Vec<f64>>())
    } else {
        None
    };

    let rhoval = if extension == 1 {
        let (_, mut cols) = read_columns(cur, mmax, 1, "valence density")?;
        cols.pop()
    } else {
        None
    };

    let radii = radii.ok_or_else(|| PspError::corrupt("abinit-8 file without radial data"))?;
    let mesh = Mesh::from_points(&radii, None)?;
    debug!("abinit-8 mesh: {}", mesh);

    let mut psp = PspData::new();
    header.fill(&mut psp)?;
    psp.set_scheme(Scheme::Oncv);

    let projectors = projectors
        .iter()
        .map(|(l, e, beta)| Projector::new(QuantumNumber::scalar(0, *l), *e, &mesh, beta))
        .collect::<Result<Vec<Projector>>>()?;
    psp.set_kb_projectors(projectors);

    if let Some(v) = vlocal {
        let qn = QuantumNumber::scalar(0, header.lloc);
        psp.set_vlocal(Some(Potential::new(qn, &mesh, &v)?));
    }

    if let Some(rho) = core {
        let (rchrg, fchrg, qchrg) = header.core_prefactors();
        let nlcc = Nlcc::new(NlccScheme::Abinit)
            .with_prefactors(rchrg, fchrg, qchrg)
            .with_density(&mesh, &rho)?;

        psp.get_xc_mut().set_nlcc(Some(nlcc));
    }

    if let Some(rho) = rhoval {
        psp.set_rho_valence(Some(MeshFunc::build(&mesh, &rho)?));
    }

    psp.set_mesh(mesh);

    Ok(psp)
}

fn read_local_block(
    cur: &mut LineCursor,
    header: &AbinitHeader,
    radii: &mut Option<Vec<f64>>,
) -> Result<Vec<f64>> {
    let line = cur.expect_line("local potential")?;
    let lloc: usize = parse_int(fields(&line, 1, "local potential")?[0])?;

    if lloc != header.lloc {
        return Err(PspError::inconsistent(format!(
            "local block for l = {} but lloc = {}",
            lloc, header.lloc
        )));
    }

    let (r, mut cols) = read_columns(cur, header.mmax, 1, "local potential")?;
    radii.get_or_insert(r);

    cols.pop()
        .ok_or_else(|| PspError::corrupt("local potential block is empty"))
}

fn write_local_block(w: &mut dyn Write, lloc: usize, r: &[f64], vlocal: &Potential) -> Result<()> {
    writeln!(w, "{:4}", lloc)?;

    for (i, &ri) in r.iter().enumerate() {
        writeln!(w, "{:6} {} {}", i + 1, sci(ri, 14), sci(vlocal.eval(ri), 14))?;
    }

    Ok(())
}

fn write_psp8(w: &mut dyn Write, psp: &PspData) -> Result<()> {
    let mesh = psp.mesh()?;
    let r = mesh.get_rad();

    let vlocal = psp
        .get_vlocal()
        .ok_or_else(|| PspError::invalid("abinit-8 needs a local potential"))?;

    if psp.get_xc().has_nlcc() && psp.get_xc().get_core_density().is_none() {
        return Err(PspError::invalid(
            "abinit-8 core correction needs a tabulated core density",
        ));
    }

    if psp.get_kb_l_max().map_or(false, |l| l > psp.get_l_max()) {
        return Err(PspError::invalid("projectors above l_max"));
    }

    let header = AbinitHeader::from_dataset(psp, 8)?;
    header.write(w)?;

    let nchan = header.channels()?;
    let nproj: Vec<usize> = (0..nchan).map(|l| psp.projectors_for(l).len()).collect();
    let extension = if psp.get_rho_valence().is_some() { 1 } else { 0 };

    let counts: Vec<String> = nproj.iter().map(|n| format!("{:5}", n)).collect();
    writeln!(w, "{}   nproj", counts.join(""))?;
    writeln!(w, "{:5}   extension_switch", extension)?;

    for l in 0..nchan {
        let projs = psp.projectors_for(l);

        if !projs.is_empty() {
            let ekb: Vec<String> = projs.iter().map(|p| sci(p.get_energy(), 14)).collect();
            writeln!(w, "{:4} {}", l, ekb.join(" "))?;

            for (i, &ri) in r.iter().enumerate() {
                let values: Vec<String> = projs.iter().map(|p| sci(p.eval(ri), 14)).collect();
                writeln!(w, "{:6} {} {}", i + 1, sci(ri, 14), values.join(" "))?;
            }
        }

        if l == header.lloc {
            write_local_block(w, header.lloc, r, vlocal)?;
        }
    }

    if header.lloc > header.lmax {
        write_local_block(w, header.lloc, r, vlocal)?;
    }

    if let Some(rho) = psp.get_xc().get_core_density() {
        let d2: Vec<f64> = r.iter().map(|&ri| FOURPI * rho.eval_deriv2(ri)).collect();
        let d2 = MeshFunc::build(mesh, &d2)?;

        for (i, &ri) in r.iter().enumerate() {
            writeln!(
                w,
                "{:6} {} {} {} {} {} {}",
                i + 1,
                sci(ri, 14),
                sci(FOURPI * rho.eval(ri), 14),
                sci(FOURPI * rho.eval_deriv(ri), 14),
                sci(d2.eval(ri), 14),
                sci(d2.eval_deriv(ri), 14),
                sci(d2.eval_deriv2(ri), 14)
            )?;
        }
    }

    if let Some(rho) = psp.get_rho_valence() {
        for (i, &ri) in r.iter().enumerate() {
            writeln!(w, "{:6} {} {}", i + 1, sci(ri, 14), sci(rho.eval(ri), 14))?;
        }
    }

    Ok(())
}

pub struct AbinitCodec {}

impl AbinitCodec {
    pub fn new() -> AbinitCodec {
        AbinitCodec {}
    }
}

impl PspCodec for AbinitCodec {
    fn read(&self, cur: &mut LineCursor, hint: Format) -> Result<PspData> {
        let header = AbinitHeader::read(cur)?;
        let format = header.format()?;

        if let Format::Abinit(code) = hint {
            if code != header.pspcod {
                return Err(PspError::malformed(format!(
                    "pspcod {} in a file read as {}",
                    header.pspcod, hint
                )));
            }
        }

        debug!("abinit header: pspcod = {} pspxc = {}", header.pspcod, header.pspxc);

        match header.pspcod {
            6 => read_psp6(cur, &header),
            8 => read_psp8(cur, &header),
            _ => Err(PspError::unsupported(format!("{} body", format))),
        }
    }

    fn write(&self, w: &mut dyn Write, psp: &PspData, format: Format) -> Result<()> {
        match format {
            Format::Abinit(6) => write_psp6(w, psp),
            Format::Abinit(8) => write_psp8(w, psp),
            _ => Err(PspError::unsupported(format!("writing {}", format))),
        }
    }
}
