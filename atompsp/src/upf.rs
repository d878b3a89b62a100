use crate::cursor::{fields, parse_bool, parse_f64, parse_int, sci, LineCursor};
use crate::element::{element_symbol, ElementTable, PeriodicTable};
use crate::tag::{expect_close_tag, locate_open_tag, read_values, tag_is_present, write_values};
use crate::xccode::{UpfXc, XcConvention};
use crate::PspCodec;
use pspconsts::{HA_TO_RY, RY_TO_HA};
use pspdata::*;
use psperror::{PspError, Result};

use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use std::io::Write;

/// Width of the functional field on the PP_HEADER xc line.
const UPF_XC_FIELD: usize = 21;

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PspError::invalid(e.to_string()))
}

/// Dates as they appear in UPF comments and attributes.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    ["%Y-%m-%d", "%d/%m/%Y", "%y%m%d", "%d%b%Y", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Principal number from a label such as `3D`; 0 if the label has none.
pub(crate) fn n_from_label(label: &str) -> Result<u32> {
    let re = regex(r"^\s*(\d+)[A-Za-z]")?;

    match re.captures(label) {
        Some(caps) => parse_int(&caps[1]),
        None => Ok(0),
    }
}

pub(crate) fn state_label(state: &State) -> String {
    if state.get_label().is_empty() {
        state.get_qn().label()
    } else {
        state.get_label().to_string()
    }
}

/// The tabulated valence density, or the occupation-weighted sum of the
/// squared wavefunctions when the dataset has none.
pub(crate) fn rhoatom(psp: &PspData) -> Result<Vec<f64>> {
    let mesh = psp.mesh()?;

    if let Some(rho) = psp.get_rho_valence() {
        return Ok(mesh.get_rad().iter().map(|&r| rho.eval(r)).collect());
    }

    debug!("valence density rebuilt from {} states", psp.get_n_states());

    Ok(mesh
        .get_rad()
        .iter()
        .map(|&r| {
            psp.get_states()
                .iter()
                .map(|s| s.get_occ() * s.wf_eval(r).powi(2))
                .sum::<f64>()
        })
        .collect())
}

fn sampled(f: &MeshFunc, mesh: &Mesh) -> Vec<f64> {
    mesh.get_rad().iter().map(|&r| f.eval(r)).collect()
}

#[derive(Debug)]
struct UpfHeader {
    symbol: String,
    nlcc: bool,
    xc: (i32, i32),
    zvalence: f64,
    total_energy: f64,
    lmax: usize,
    np: usize,
    nwfc: usize,
    nproj: usize,
}

fn first_field(cur: &mut LineCursor, what: &str) -> Result<String> {
    let line = cur.expect_line(what)?;

    Ok(fields(&line, 1, what)?[0].to_string())
}

fn read_header(cur: &mut LineCursor) -> Result<UpfHeader> {
    locate_open_tag(cur, "PP_HEADER", true)?;

    let version: i32 = parse_int(&first_field(cur, "version")?)?;
    debug!("UPF header version {}", version);

    let symbol = first_field(cur, "element")?;

    let kind = first_field(cur, "pseudo type")?.to_uppercase();
    match kind.as_str() {
        "NC" | "SL" => {}
        "US" | "PAW" => return Err(PspError::unsupported(format!("{} pseudopotential", kind))),
        _ => return Err(PspError::corrupt(format!("unknown pseudo type '{}'", kind))),
    }

    let nlcc = parse_bool(&first_field(cur, "core correction")?)?;

    let line = cur.expect_line("functional")?;
    let functional: String = line.chars().take(UPF_XC_FIELD).collect();
    let xc = UpfXc.to_canonical(&functional)?;

    let zvalence = parse_f64(&first_field(cur, "z valence")?)?;
    let total_energy = parse_f64(&first_field(cur, "total energy")?)? * RY_TO_HA;

    let line = cur.expect_line("cutoffs")?;
    fields(&line, 2, "cutoffs")?;

    let lmax: usize = parse_int(&first_field(cur, "lmax")?)?;
    let np: usize = parse_int(&first_field(cur, "mesh size")?)?;

    let line = cur.expect_line("nwfc, nproj")?;
    let tokens = fields(&line, 2, "nwfc, nproj")?;
    let nwfc: usize = parse_int(tokens[0])?;
    let nproj: usize = parse_int(tokens[1])?;

    // the wavefunction table is repeated in PP_PSWFC
    let table_lines = nwfc
        .checked_add(1)
        .ok_or_else(|| PspError::corrupt(format!("{} wavefunctions declared", nwfc)))?;
    cur.skip_lines(table_lines, "wavefunction table")?;
    expect_close_tag(cur, "PP_HEADER")?;

    Ok(UpfHeader {
        symbol,
        nlcc,
        xc,
        zvalence,
        total_energy,
        lmax,
        np,
        nwfc,
        nproj,
    })
}

/// Free text of PP_INFO; author, code, date and description lines are
/// picked out into `PspInfo`.
fn read_info(cur: &mut LineCursor) -> Result<(String, PspInfo)> {
    let author = regex(r"(?i)^\s*author\s*:\s*(.*?)\s*$")?;
    let date = regex(r"(?i)^\s*generation date\s*:\s*(.*?)\s*$")?;
    let code = regex(r"(?i)^\s*generated (?:using|by)\s+(.*?)(?:\s+code)?\s*$")?;
    let description = regex(r"(?i)^\s*description\s*:\s*(.*?)\s*$")?;

    let mut info = Vec::new();
    let mut pspinfo = PspInfo::default();

    locate_open_tag(cur, "PP_INFO", true)?;

    loop {
        let line = cur
            .next_line()
            .ok_or_else(|| PspError::malformed("stream ended before </PP_INFO>"))?
            .to_string();

        if line.trim_start().to_lowercase().starts_with("</pp_info>") {
            break;
        }

        if let Some(c) = author.captures(&line) {
            pspinfo.author = c[1].to_string();
        } else if let Some(c) = date.captures(&line) {
            pspinfo.date = parse_date(&c[1]);
        } else if let Some(c) = code.captures(&line) {
            pspinfo.code = c[1].trim_matches('"').to_string();
        } else if let Some(c) = description.captures(&line) {
            pspinfo.description = c[1].to_string();
        } else if !line.trim().is_empty() {
            info.push(line.trim().to_string());
        }
    }

    Ok((info.join("\n"), pspinfo))
}

fn read_mesh(cur: &mut LineCursor, np: usize) -> Result<Mesh> {
    locate_open_tag(cur, "PP_MESH", true)?;

    locate_open_tag(cur, "PP_R", false)?;
    let r = read_values(cur, np, "PP_R")?;
    expect_close_tag(cur, "PP_R")?;

    locate_open_tag(cur, "PP_RAB", false)?;
    let rab = read_values(cur, np, "PP_RAB")?;
    expect_close_tag(cur, "PP_RAB")?;

    expect_close_tag(cur, "PP_MESH")?;

    Mesh::from_points(&r, Some(&rab))
}

fn read_block(cur: &mut LineCursor, tag: &str, np: usize) -> Result<Vec<f64>> {
    locate_open_tag(cur, tag, true)?;
    let values = read_values(cur, np, tag)?;
    expect_close_tag(cur, tag)?;

    Ok(values)
}

/// j values of the states and projectors, from PP_ADDINFO.
fn read_addinfo(cur: &mut LineCursor, header: &UpfHeader) -> Result<(Vec<f64>, Vec<f64>)> {
    locate_open_tag(cur, "PP_ADDINFO", true)?;

    let mut state_j = Vec::with_capacity(header.nwfc);
    for _ in 0..header.nwfc {
        let line = cur.expect_line("PP_ADDINFO state")?;
        let tokens = fields(&line, 4, "PP_ADDINFO state")?;
        state_j.push(parse_f64(tokens[3])?);
    }

    let mut proj_j = Vec::with_capacity(header.nproj);
    for _ in 0..header.nproj {
        let line = cur.expect_line("PP_ADDINFO projector")?;
        let tokens = fields(&line, 2, "PP_ADDINFO projector")?;
        proj_j.push(parse_f64(tokens[1])?);
    }

    Ok((state_j, proj_j))
}

fn read_nonlocal(
    cur: &mut LineCursor,
    header: &UpfHeader,
    mesh: &Mesh,
    proj_j: &[f64],
) -> Result<Vec<Projector>> {
    let nproj = header.nproj;
    let mut ekb = vec![0.0; nproj];

    // coupling energies first, then back for the projector functions
    locate_open_tag(cur, "PP_NONLOCAL", true)?;
    locate_open_tag(cur, "PP_DIJ", false)?;

    let line = cur.expect_line("PP_DIJ")?;
    let n_dij: usize = parse_int(fields(&line, 1, "PP_DIJ")?[0])?;

    for _ in 0..n_dij {
        let line = cur.expect_line("PP_DIJ")?;
        let tokens = fields(&line, 3, "PP_DIJ")?;
        let i: usize = parse_int(tokens[0])?;
        let j: usize = parse_int(tokens[1])?;

        if i != j {
            return Err(PspError::inconsistent(format!(
                "off-diagonal D({}, {}) in a norm-conserving file",
                i, j
            )));
        }

        if i == 0 || i > nproj {
            return Err(PspError::inconsistent(format!(
                "D({}, {}) refers to one of {} projectors",
                i, j, nproj
            )));
        }

        ekb[i - 1] = parse_f64(tokens[2])? * HA_TO_RY;
    }

    expect_close_tag(cur, "PP_DIJ")?;
    expect_close_tag(cur, "PP_NONLOCAL")?;

    locate_open_tag(cur, "PP_NONLOCAL", true)?;

    let mut projectors = Vec::with_capacity(nproj);

    for (ibeta, &e) in ekb.iter().enumerate() {
        locate_open_tag(cur, "PP_BETA", false)?;

        let line = cur.expect_line("PP_BETA")?;
        let tokens = fields(&line, 2, "PP_BETA")?;
        let index: usize = parse_int(tokens[0])?;
        let l: usize = parse_int(tokens[1])?;

        if index != ibeta + 1 {
            return Err(PspError::inconsistent(format!(
                "PP_BETA {} found where {} was expected",
                index,
                ibeta + 1
            )));
        }

        let line = cur.expect_line("PP_BETA size")?;
        let proj_np: usize = parse_int(fields(&line, 1, "PP_BETA size")?[0])?;

        if proj_np > header.np {
            return Err(PspError::inconsistent(format!(
                "PP_BETA {} has {} points, the mesh has {}",
                index, proj_np, header.np
            )));
        }

        let mut beta: Vec<f64> = read_values(cur, proj_np, "PP_BETA")?
            .into_iter()
            .map(|x| x * RY_TO_HA)
            .collect();
        beta.resize(header.np, 0.0);

        expect_close_tag(cur, "PP_BETA")?;

        let j = proj_j.get(ibeta).copied().unwrap_or(0.0);
        let qn = QuantumNumber::new(0, l, j)?;

        projectors.push(Projector::new(qn, e, mesh, &beta)?);
    }

    Ok(projectors)
}

fn read_pswfc(
    cur: &mut LineCursor,
    header: &UpfHeader,
    mesh: &Mesh,
    state_j: &[f64],
) -> Result<Vec<State>> {
    locate_open_tag(cur, "PP_PSWFC", true)?;

    let mut states = Vec::with_capacity(header.nwfc);

    for i in 0..header.nwfc {
        let line = cur.expect_line("PP_PSWFC")?;
        let tokens = fields(&line, 3, "PP_PSWFC")?;
        let label = tokens[0].to_string();
        let l: usize = parse_int(tokens[1])?;
        let occ = parse_f64(tokens[2])?;

        let u = read_values(cur, header.np, "PP_PSWFC")?;

        let j = state_j.get(i).copied().unwrap_or(0.0);
        let qn = QuantumNumber::new(n_from_label(&label)?, l, j)?;

        states.push(State::new(&label, qn, occ, 0.0, mesh, &u)?);
    }

    expect_close_tag(cur, "PP_PSWFC")?;

    Ok(states)
}

pub struct UpfCodec {
    elements: Box<dyn ElementTable>,
}

impl UpfCodec {
    pub fn new() -> UpfCodec {
        UpfCodec::with_elements(Box::new(PeriodicTable))
    }

    pub fn with_elements(elements: Box<dyn ElementTable>) -> UpfCodec {
        UpfCodec { elements }
    }
}

impl PspCodec for UpfCodec {
    fn read(&self, cur: &mut LineCursor, _hint: Format) -> Result<PspData> {
        let header = read_header(cur)?;
        debug!("{:?}", header);

        let mut psp = PspData::new();

        psp.set_format_guessed(Format::Upf);
        psp.set_symbol(&header.symbol);
        psp.set_z(self.elements.symbol_to_z(&header.symbol)? as f64);
        psp.set_zvalence(header.zvalence);
        psp.set_total_energy(header.total_energy);
        psp.set_l_max(header.lmax);

        if tag_is_present(cur, "PP_INFO") {
            let (info, pspinfo) = read_info(cur)?;
            psp.set_info(&info);
            psp.set_pspinfo(pspinfo);
        }

        let mesh = read_mesh(cur, header.np)?;
        debug!("UPF mesh: {}", mesh);

        let mut xc = Xc::new(header.xc.0, header.xc.1);
        if header.nlcc {
            let rho = read_block(cur, "PP_NLCC", header.np)?;
            xc.set_nlcc(Some(Nlcc::new(NlccScheme::Upf).with_density(&mesh, &rho)?));
        }
        psp.set_xc(xc);

        let (state_j, proj_j) = if tag_is_present(cur, "PP_ADDINFO") {
            psp.set_wave_eq(WaveEq::Dirac);
            read_addinfo(cur, &header)?
        } else {
            (Vec::new(), Vec::new())
        };

        if header.nproj > 0 {
            let projectors = read_nonlocal(cur, &header, &mesh, &proj_j)?;
            psp.set_kb_projectors(projectors);
        }

        let l_local = psp.resolve_l_local();

        let vlocal: Vec<f64> = read_block(cur, "PP_LOCAL", header.np)?
            .into_iter()
            .map(|v| v * RY_TO_HA)
            .collect();
        let qn = QuantumNumber::scalar(0, l_local.unwrap_or(header.lmax + 1));
        psp.set_vlocal(Some(Potential::new(qn, &mesh, &vlocal)?));

        let states = read_pswfc(cur, &header, &mesh, &state_j)?;
        psp.set_nelvalence(states.iter().map(|s| s.get_occ()).sum());
        psp.set_states(states);

        let rho = read_block(cur, "PP_RHOATOM", header.np)?;
        psp.set_rho_valence(Some(MeshFunc::build(&mesh, &rho)?));

        psp.set_mesh(mesh);

        Ok(psp)
    }

    fn write(&self, w: &mut dyn Write, psp: &PspData, _format: Format) -> Result<()> {
        let mesh = psp.mesh()?;

        let vlocal = psp
            .get_vlocal()
            .ok_or_else(|| PspError::invalid("UPF needs a local potential"))?;

        let (exchange, correlation) = psp.get_xc().get_pair();
        let functional = UpfXc.from_canonical(exchange, correlation)?;

        let core = match psp.get_xc().get_nlcc() {
            Some(nlcc) => match nlcc.get_density() {
                Some(rho) => Some(rho),
                None => {
                    return Err(PspError::invalid(
                        "UPF core correction needs a tabulated core density",
                    ));
                }
            },
            None => None,
        };

        let symbol = element_symbol(self.elements.as_ref(), psp)?;

        write_info(w, psp)?;

        writeln!(w, "<PP_HEADER>")?;
        writeln!(w, "   0                   Version Number")?;
        writeln!(w, "  {:<2}                  Element", symbol)?;
        writeln!(w, "   NC                  Norm - Conserving pseudopotential")?;
        writeln!(
            w,
            "    {}                  Nonlinear Core Correction",
            if core.is_some() { "T" } else { "F" }
        )?;
        writeln!(w, " {:<20}Exchange-Correlation functional", functional)?;
        writeln!(w, "{:>20}    Z valence", sci(psp.get_zvalence(), 11))?;
        writeln!(w, "{:>20}    Total energy", sci(psp.get_total_energy() * HA_TO_RY, 11))?;
        writeln!(w, "{:>20}{:>20}    Suggested cutoff for wfc and rho", sci(0.0, 7), sci(0.0, 7))?;
        writeln!(w, "{:5}                  Max angular momentum component", psp.get_l_max())?;
        writeln!(w, "{:5}                  Number of points in mesh", mesh.get_np())?;
        writeln!(
            w,
            "{:5}{:5}             Number of Wavefunctions, Number of Projectors",
            psp.get_n_states(),
            psp.get_n_kbproj()
        )?;
        writeln!(w, " Wavefunctions         nl  l   occ")?;
        for s in psp.get_states() {
            writeln!(
                w,
                "                       {:<2}{:4}{:14.10}",
                state_label(s),
                s.get_qn().get_l(),
                s.get_occ()
            )?;
        }
        writeln!(w, "</PP_HEADER>")?;

        writeln!(w, "<PP_MESH>")?;
        writeln!(w, "  <PP_R>")?;
        write_values(w, mesh.get_rad())?;
        writeln!(w, "  </PP_R>")?;
        writeln!(w, "  <PP_RAB>")?;
        write_values(w, mesh.get_rab())?;
        writeln!(w, "  </PP_RAB>")?;
        writeln!(w, "</PP_MESH>")?;

        if let Some(rho) = core {
            writeln!(w, "<PP_NLCC>")?;
            write_values(w, &sampled(rho, mesh))?;
            writeln!(w, "</PP_NLCC>")?;
        }

        writeln!(w, "<PP_LOCAL>")?;
        let v: Vec<f64> = sampled(vlocal.get_v(), mesh).iter().map(|v| v * HA_TO_RY).collect();
        write_values(w, &v)?;
        writeln!(w, "</PP_LOCAL>")?;

        if psp.get_n_kbproj() > 0 {
            write_nonlocal(w, psp, mesh)?;
        }

        writeln!(w, "<PP_PSWFC>")?;
        for s in psp.get_states() {
            writeln!(
                w,
                "{:<2}{:5}{:14.10}          Wavefunction",
                state_label(s),
                s.get_qn().get_l(),
                s.get_occ()
            )?;
            write_values(w, &sampled(s.get_wf(), mesh))?;
        }
        writeln!(w, "</PP_PSWFC>")?;

        writeln!(w, "<PP_RHOATOM>")?;
        write_values(w, &rhoatom(psp)?)?;
        writeln!(w, "</PP_RHOATOM>")?;

        let has_j = psp.get_states().iter().any(|s| s.get_qn().has_j())
            || psp.get_kb_projectors().iter().any(|p| p.get_qn().has_j());

        if has_j || psp.get_wave_eq() == WaveEq::Dirac {
            write_addinfo(w, psp, mesh)?;
        }

        Ok(())
    }
}

fn write_info(w: &mut dyn Write, psp: &PspData) -> Result<()> {
    let pspinfo = psp.get_pspinfo();

    writeln!(w, "<PP_INFO>")?;

    for line in psp.get_info().lines() {
        writeln!(w, "  {}", line)?;
    }

    if !pspinfo.code.is_empty() {
        writeln!(w, "  Generated using {} code", pspinfo.code)?;
    }

    if !pspinfo.author.is_empty() {
        writeln!(w, "  Author: {}", pspinfo.author)?;
    }

    if let Some(date) = pspinfo.date {
        writeln!(w, "  Generation date: {}", date.format("%Y-%m-%d"))?;
    }

    if !pspinfo.description.is_empty() {
        writeln!(w, "  Description: {}", pspinfo.description)?;
    }

    writeln!(w, "</PP_INFO>")?;

    Ok(())
}

fn write_nonlocal(w: &mut dyn Write, psp: &PspData, mesh: &Mesh) -> Result<()> {
    writeln!(w, "<PP_NONLOCAL>")?;

    for (i, p) in psp.get_kb_projectors().iter().enumerate() {
        let beta: Vec<f64> = sampled(p.get_proj(), mesh).iter().map(|x| x * HA_TO_RY).collect();

        writeln!(w, "  <PP_BETA>")?;
        writeln!(w, "{:5}{:5}             Beta    L", i + 1, p.get_l())?;
        writeln!(w, "{:6}", mesh.get_np())?;
        write_values(w, &beta)?;
        writeln!(w, "  </PP_BETA>")?;
    }

    writeln!(w, "  <PP_DIJ>")?;
    writeln!(w, "{:5}                  Number of nonzero Dij", psp.get_n_kbproj())?;
    for (i, p) in psp.get_kb_projectors().iter().enumerate() {
        writeln!(w, "{:5}{:5}{:>20}", i + 1, i + 1, sci(p.get_energy() * RY_TO_HA, 11))?;
    }
    writeln!(w, "  </PP_DIJ>")?;

    writeln!(w, "</PP_NONLOCAL>")?;

    Ok(())
}

fn write_addinfo(w: &mut dyn Write, psp: &PspData, mesh: &Mesh) -> Result<()> {
    writeln!(w, "<PP_ADDINFO>")?;

    for s in psp.get_states() {
        let qn = s.get_qn();

        writeln!(
            w,
            "{:<2}{:3}{:3}{:6.2}{:14.10}",
            state_label(s),
            qn.get_n(),
            qn.get_l(),
            qn.get_j(),
            s.get_occ()
        )?;
    }

    for p in psp.get_kb_projectors() {
        writeln!(w, "{:6}{:6.2}", p.get_l(), p.get_qn().get_j())?;
    }

    let r0 = mesh.r_min();
    let zmesh = psp.get_z();
    let xmin = if r0 > 0.0 && zmesh > 0.0 {
        (r0 * zmesh).ln()
    } else {
        0.0
    };

    writeln!(
        w,
        "{:>20}{:>20}{:>20}{:>20}",
        sci(xmin, 11),
        sci(mesh.r_max(), 11),
        sci(zmesh, 11),
        sci(mesh.get_a(), 11)
    )?;

    writeln!(w, "</PP_ADDINFO>")?;

    Ok(())
}
