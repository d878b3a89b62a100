use crate::cursor::{parse_bool, parse_f64, parse_int, sci, LineCursor};
use crate::element::{element_symbol, ElementTable, PeriodicTable};
use crate::tag::format_values;
use crate::upf::{n_from_label, parse_date, rhoatom, state_label};
use crate::xccode::{UpfXc, XcConvention};
use crate::PspCodec;
use pspconsts::{EPS10, HA_TO_RY, RY_TO_HA};
use pspdata::*;
use psperror::{PspError, Result};

use log::{debug, warn};
use std::{collections::HashMap, io::Write};

use xml::reader::{EventReader, XmlEvent};
use xml::writer::{EmitterConfig, XmlEvent as XmlOut};

type Attributes = HashMap<String, String>;

fn xml_error<E: std::fmt::Display>(e: E) -> PspError {
    PspError::Xml(e.to_string())
}

fn values(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace().map(parse_f64).collect()
}

/// Elements of a UPF v2 document, collected before the dataset is built.
#[derive(Debug, Default)]
struct Upf2Document {
    info: String,
    header: Attributes,
    r: Vec<f64>,
    rab: Vec<f64>,
    nlcc: Option<Vec<f64>>,
    local: Option<Vec<f64>>,
    betas: Vec<(Attributes, Vec<f64>)>,
    dij: Vec<f64>,
    chis: Vec<(Attributes, Vec<f64>)>,
    rhoatom: Option<Vec<f64>>,
    relwfc: Vec<Attributes>,
    relbeta: Vec<Attributes>,
}

impl Upf2Document {
    fn parse(text: &str) -> Result<Upf2Document> {
        let mut parser = EventReader::new(text.as_bytes());
        let mut doc = Upf2Document::default();

        // open elements with their attributes and text
        let mut stack: Vec<(String, Attributes, String)> = Vec::new();
        let mut seen_root = false;

        loop {
            match parser.next().map_err(xml_error)? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let attrs: Attributes = attributes
                        .into_iter()
                        .map(|a| (a.name.local_name, a.value.trim().to_string()))
                        .collect();

                    if !seen_root {
                        if name.local_name != "UPF" {
                            return Err(PspError::malformed(format!(
                                "root element <{}> is not <UPF>",
                                name.local_name
                            )));
                        }

                        let version = attrs.get("version").map(|v| v.as_str()).unwrap_or("");
                        if !version.starts_with('2') {
                            return Err(PspError::malformed(format!(
                                "UPF version '{}' is not 2",
                                version
                            )));
                        }

                        seen_root = true;
                    }

                    stack.push((name.local_name, attrs, String::new()));
                }

                XmlEvent::Characters(s) | XmlEvent::CData(s) => {
                    if let Some((_, _, text)) = stack.last_mut() {
                        text.push_str(&s);
                    }
                }

                XmlEvent::EndElement { .. } => {
                    if let Some((name, attrs, text)) = stack.pop() {
                        doc.take(&name, attrs, &text)?;

                        if name == "UPF" {
                            break;
                        }
                    }
                }

                XmlEvent::EndDocument => {
                    return Err(PspError::malformed("document ended before </UPF>"));
                }

                _ => {}
            }
        }

        Ok(doc)
    }

    fn take(&mut self, name: &str, attrs: Attributes, text: &str) -> Result<()> {
        match name {
            "PP_INFO" => self.info = text.trim().to_string(),
            "PP_HEADER" => self.header = attrs,
            "PP_R" => self.r = values(text)?,
            "PP_RAB" => self.rab = values(text)?,
            "PP_NLCC" => self.nlcc = Some(values(text)?),
            "PP_LOCAL" => self.local = Some(values(text)?),
            "PP_DIJ" => self.dij = values(text)?,
            "PP_RHOATOM" => self.rhoatom = Some(values(text)?),

            _ if name.starts_with("PP_BETA.") => self.betas.push((attrs, values(text)?)),
            _ if name.starts_with("PP_CHI.") => self.chis.push((attrs, values(text)?)),
            _ if name.starts_with("PP_RELWFC.") => self.relwfc.push(attrs),
            _ if name.starts_with("PP_RELBETA.") => self.relbeta.push(attrs),

            _ => {}
        }

        Ok(())
    }

    fn header_str(&self, key: &str) -> Result<&str> {
        self.header
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| PspError::corrupt(format!("PP_HEADER lacks '{}'", key)))
    }

    fn header_flag(&self, key: &str) -> Result<bool> {
        match self.header.get(key) {
            Some(v) => parse_bool(v),
            None => Ok(false),
        }
    }
}

fn attr<'a>(attrs: &'a Attributes, key: &str, what: &str) -> Result<&'a str> {
    attrs
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| PspError::corrupt(format!("{} lacks '{}'", what, key)))
}

/// Values on `np` points; shorter tables are padded with zeros.
fn padded(mut v: Vec<f64>, np: usize, what: &str) -> Result<Vec<f64>> {
    if v.len() > np {
        return Err(PspError::inconsistent(format!(
            "{} has {} values for {} mesh points",
            what,
            v.len(),
            np
        )));
    }

    v.resize(np, 0.0);

    Ok(v)
}

fn build(doc: Upf2Document, elements: &dyn ElementTable) -> Result<PspData> {
    let pseudo_type = doc.header_str("pseudo_type")?.to_uppercase();
    if !(pseudo_type == "NC" || pseudo_type == "SL")
        || doc.header_flag("is_ultrasoft")?
        || doc.header_flag("is_paw")?
    {
        return Err(PspError::unsupported(format!("{} pseudopotential", pseudo_type)));
    }

    let np: usize = parse_int(doc.header_str("mesh_size")?)?;
    let nwfc: usize = parse_int(doc.header_str("number_of_wfc")?)?;
    let nproj: usize = parse_int(doc.header_str("number_of_proj")?)?;
    let l_max: usize = parse_int(doc.header_str("l_max")?)?;

    if doc.r.len() != np || doc.rab.len() != np {
        return Err(PspError::inconsistent(format!(
            "mesh_size = {} but PP_R has {} and PP_RAB {} values",
            np,
            doc.r.len(),
            doc.rab.len()
        )));
    }

    if doc.betas.len() != nproj || doc.chis.len() != nwfc {
        return Err(PspError::inconsistent(format!(
            "header announces {} projectors and {} wavefunctions, found {} and {}",
            nproj,
            nwfc,
            doc.betas.len(),
            doc.chis.len()
        )));
    }

    let mesh = Mesh::from_points(&doc.r, Some(&doc.rab))?;
    debug!("UPF v2 mesh: {}", mesh);

    let mut psp = PspData::new();

    psp.set_format_guessed(Format::Upf2);
    psp.set_info(&doc.info);
    let symbol = doc.header_str("element")?;
    psp.set_symbol(symbol);
    psp.set_z(elements.symbol_to_z(symbol)? as f64);
    psp.set_zvalence(parse_f64(doc.header_str("z_valence")?)?);
    psp.set_l_max(l_max);

    if let Some(etot) = doc.header.get("total_psenergy") {
        psp.set_total_energy(parse_f64(etot)? * RY_TO_HA);
    }

    psp.set_wave_eq(match doc.header.get("relativistic").map(|s| s.to_lowercase()) {
        Some(ref s) if s == "scalar" => WaveEq::ScalarRelativistic,
        Some(ref s) if s == "full" => WaveEq::Dirac,
        _ => WaveEq::Schrodinger,
    });

    psp.set_pspinfo(PspInfo {
        author: doc.header.get("author").cloned().unwrap_or_default(),
        code: doc.header.get("generated").cloned().unwrap_or_default(),
        date: doc.header.get("date").and_then(|d| parse_date(d)),
        description: doc.header.get("comment").cloned().unwrap_or_default(),
    });

    let (exchange, correlation) = UpfXc.to_canonical(&doc.header_str("functional")?.to_string())?;
    let mut xc = Xc::new(exchange, correlation);

    if doc.header_flag("core_correction")? {
        let rho = doc
            .nlcc
            .clone()
            .ok_or_else(|| PspError::malformed("core_correction set but PP_NLCC missing"))?;
        let rho = padded(rho, np, "PP_NLCC")?;

        xc.set_nlcc(Some(Nlcc::new(NlccScheme::Upf).with_density(&mesh, &rho)?));
    }
    psp.set_xc(xc);

    let has_so = doc.header_flag("has_so")?;
    let jvalue = |attrs: Option<&Attributes>, key: &str| -> Result<f64> {
        match attrs.and_then(|a| a.get(key)) {
            Some(j) if has_so => parse_f64(j),
            _ => Ok(0.0),
        }
    };

    // projectors
    if nproj > 0 && doc.dij.len() != nproj * nproj {
        return Err(PspError::inconsistent(format!(
            "PP_DIJ has {} values for {} projectors",
            doc.dij.len(),
            nproj
        )));
    }

    let mut projectors = Vec::with_capacity(nproj);
    for (i, (attrs, beta)) in doc.betas.iter().enumerate() {
        for j in 0..nproj {
            if i != j && doc.dij[i * nproj + j].abs() > EPS10 {
                return Err(PspError::inconsistent(format!(
                    "off-diagonal D({}, {}) in a norm-conserving file",
                    i + 1,
                    j + 1
                )));
            }
        }

        let what = format!("PP_BETA.{}", i + 1);
        let l: usize = parse_int(attr(attrs, "angular_momentum", &what)?)?;
        let j = jvalue(doc.relbeta.get(i), "jjj")?;

        let beta: Vec<f64> = beta.iter().map(|x| x * RY_TO_HA).collect();
        let beta = padded(beta, np, &what)?;

        projectors.push(Projector::new(
            QuantumNumber::new(0, l, j)?,
            doc.dij[i * nproj + i] * HA_TO_RY,
            &mesh,
            &beta,
        )?);
    }
    psp.set_kb_projectors(projectors);

    let l_local = match doc.header.get("l_local") {
        Some(l) => {
            let l: i64 = parse_int(l)?;
            psp.set_l_local(if l >= 0 { Some(l as usize) } else { None });
            psp.get_l_local()
        }
        None => psp.resolve_l_local(),
    };

    let vlocal = doc
        .local
        .clone()
        .ok_or_else(|| PspError::malformed("PP_LOCAL missing"))?;
    let vlocal: Vec<f64> = padded(vlocal, np, "PP_LOCAL")?
        .into_iter()
        .map(|v| v * RY_TO_HA)
        .collect();
    let qn = QuantumNumber::scalar(0, l_local.unwrap_or(l_max + 1));
    psp.set_vlocal(Some(Potential::new(qn, &mesh, &vlocal)?));

    // pseudo wavefunctions
    let mut states = Vec::with_capacity(nwfc);
    for (i, (attrs, chi)) in doc.chis.iter().enumerate() {
        let what = format!("PP_CHI.{}", i + 1);

        let label = attrs.get("label").cloned().unwrap_or_default();
        let l: usize = parse_int(attr(attrs, "l", &what)?)?;
        let occ = parse_f64(attr(attrs, "occupation", &what)?)?;
        let n = match attrs.get("n") {
            Some(n) => parse_int(n)?,
            None => n_from_label(&label)?,
        };
        let eigenval = match attrs.get("pseudo_energy") {
            Some(e) => parse_f64(e)? * RY_TO_HA,
            None => 0.0,
        };
        let j = jvalue(doc.relwfc.get(i), "jchi")?;

        let u = padded(chi.clone(), np, &what)?;
        let mut state = State::new(&label, QuantumNumber::new(n, l, j)?, occ, eigenval, &mesh, &u)?;

        if let Some(rc) = attrs.get("cutoff_radius") {
            state = state.with_rc(parse_f64(rc)?);
        }

        states.push(state);
    }
    psp.set_nelvalence(states.iter().map(|s| s.get_occ()).sum::<f64>());
    psp.set_states(states);

    match doc.rhoatom {
        Some(rho) => {
            let rho = padded(rho, np, "PP_RHOATOM")?;
            psp.set_rho_valence(Some(MeshFunc::build(&mesh, &rho)?));
        }
        None => warn!("UPF v2 file without PP_RHOATOM"),
    }

    psp.set_mesh(mesh);

    Ok(psp)
}

/// Start tag with attributes, the text, and the end tag.
fn element<W: Write>(
    writer: &mut xml::EventWriter<W>,
    name: &str,
    attrs: &[(&str, String)],
    text: Option<&str>,
) -> Result<()> {
    let mut start = XmlOut::start_element(name);
    for (key, value) in attrs.iter() {
        start = start.attr(*key, value.as_str());
    }

    writer.write(start).map_err(xml_error)?;

    if let Some(text) = text {
        writer.write(XmlOut::characters(text)).map_err(xml_error)?;
    }

    writer.write(XmlOut::end_element()).map_err(xml_error)?;

    Ok(())
}

fn array<W: Write>(writer: &mut xml::EventWriter<W>, name: &str, v: &[f64]) -> Result<()> {
    let text = format!("\n{}\n", format_values(v));

    element(
        writer,
        name,
        &[
            ("type", "real".to_string()),
            ("size", v.len().to_string()),
            ("columns", "4".to_string()),
        ],
        Some(&text),
    )
}

fn flag(b: bool) -> String {
    let s = if b { "T" } else { "F" };

    s.to_string()
}

fn sampled(f: &MeshFunc, mesh: &Mesh, scale: f64) -> Vec<f64> {
    mesh.get_rad().iter().map(|&r| scale * f.eval(r)).collect()
}

fn write_document(w: &mut dyn Write, psp: &PspData, elements: &dyn ElementTable) -> Result<()> {
    let mesh = psp.mesh()?;
    let np = mesh.get_np();

    let vlocal = psp
        .get_vlocal()
        .ok_or_else(|| PspError::invalid("UPF needs a local potential"))?;

    let (exchange, correlation) = psp.get_xc().get_pair();
    let functional = UpfXc.from_canonical(exchange, correlation)?;

    let core = psp.get_xc().get_core_density();
    if psp.get_xc().has_nlcc() && core.is_none() {
        return Err(PspError::invalid(
            "UPF core correction needs a tabulated core density",
        ));
    }

    let has_so = psp.get_states().iter().any(|s| s.get_qn().has_j())
        || psp.get_kb_projectors().iter().any(|p| p.get_qn().has_j());

    let pspinfo = psp.get_pspinfo();
    let relativistic = match psp.get_wave_eq() {
        WaveEq::Schrodinger => "no",
        WaveEq::ScalarRelativistic => "scalar",
        WaveEq::Dirac => "full",
    };

    let mut writer = EmitterConfig::new()
        .perform_indent(true)
        .create_writer(w);

    writer
        .write(XmlOut::start_element("UPF").attr("version", "2.0.1"))
        .map_err(xml_error)?;

    element(&mut writer, "PP_INFO", &[], Some(psp.get_info()))?;

    let mut header = vec![
        ("generated", pspinfo.code.clone()),
        ("author", pspinfo.author.clone()),
        (
            "date",
            pspinfo
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ),
        ("comment", pspinfo.description.clone()),
        ("element", element_symbol(elements, psp)?),
        ("pseudo_type", "NC".to_string()),
        ("relativistic", relativistic.to_string()),
        ("is_ultrasoft", flag(false)),
        ("is_paw", flag(false)),
        ("has_so", flag(has_so)),
        ("core_correction", flag(core.is_some())),
        ("functional", functional),
        ("z_valence", sci(psp.get_zvalence(), 14)),
        ("total_psenergy", sci(psp.get_total_energy() * HA_TO_RY, 14)),
        ("l_max", psp.get_l_max().to_string()),
        (
            "l_local",
            psp.get_l_local()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-1".to_string()),
        ),
        ("mesh_size", np.to_string()),
        ("number_of_wfc", psp.get_n_states().to_string()),
        ("number_of_proj", psp.get_n_kbproj().to_string()),
    ];
    header.retain(|(_, v)| !v.is_empty());
    element(&mut writer, "PP_HEADER", &header, None)?;

    writer
        .write(XmlOut::start_element("PP_MESH").attr("mesh", &np.to_string()))
        .map_err(xml_error)?;
    array(&mut writer, "PP_R", mesh.get_rad())?;
    array(&mut writer, "PP_RAB", mesh.get_rab())?;
    writer.write(XmlOut::end_element()).map_err(xml_error)?;

    if let Some(rho) = core {
        array(&mut writer, "PP_NLCC", &sampled(rho, mesh, 1.0))?;
    }

    array(&mut writer, "PP_LOCAL", &sampled(vlocal.get_v(), mesh, HA_TO_RY))?;

    writer
        .write(XmlOut::start_element("PP_NONLOCAL"))
        .map_err(xml_error)?;

    let nproj = psp.get_n_kbproj();
    let mut dij = vec![0.0; nproj * nproj];

    for (i, p) in psp.get_kb_projectors().iter().enumerate() {
        let beta = sampled(p.get_proj(), mesh, HA_TO_RY);
        let text = format!("\n{}\n", format_values(&beta));

        element(
            &mut writer,
            &format!("PP_BETA.{}", i + 1),
            &[
                ("type", "real".to_string()),
                ("size", np.to_string()),
                ("columns", "4".to_string()),
                ("index", (i + 1).to_string()),
                ("angular_momentum", p.get_l().to_string()),
            ],
            Some(&text),
        )?;

        dij[i * nproj + i] = p.get_energy() * RY_TO_HA;
    }

    array(&mut writer, "PP_DIJ", &dij)?;
    writer.write(XmlOut::end_element()).map_err(xml_error)?;

    writer
        .write(XmlOut::start_element("PP_PSWFC"))
        .map_err(xml_error)?;

    for (i, s) in psp.get_states().iter().enumerate() {
        let qn = s.get_qn();
        let u = sampled(s.get_wf(), mesh, 1.0);
        let text = format!("\n{}\n", format_values(&u));

        let mut attrs = vec![
            ("type", "real".to_string()),
            ("size", np.to_string()),
            ("columns", "4".to_string()),
            ("index", (i + 1).to_string()),
            ("label", state_label(s)),
            ("l", qn.get_l().to_string()),
            ("occupation", sci(s.get_occ(), 14)),
            ("n", qn.get_n().to_string()),
            ("pseudo_energy", sci(s.get_eigenval() * HA_TO_RY, 14)),
        ];
        if let Some(rc) = s.get_rc() {
            attrs.push(("cutoff_radius", sci(rc, 14)));
        }

        element(&mut writer, &format!("PP_CHI.{}", i + 1), &attrs, Some(&text))?;
    }

    writer.write(XmlOut::end_element()).map_err(xml_error)?;

    array(&mut writer, "PP_RHOATOM", &rhoatom(psp)?)?;

    if has_so {
        writer
            .write(XmlOut::start_element("PP_SPIN_ORB"))
            .map_err(xml_error)?;

        for (i, s) in psp.get_states().iter().enumerate() {
            let qn = s.get_qn();

            element(
                &mut writer,
                &format!("PP_RELWFC.{}", i + 1),
                &[
                    ("index", (i + 1).to_string()),
                    ("lchi", qn.get_l().to_string()),
                    ("jchi", sci(qn.get_j(), 14)),
                    ("nn", qn.get_n().to_string()),
                ],
                None,
            )?;
        }

        for (i, p) in psp.get_kb_projectors().iter().enumerate() {
            element(
                &mut writer,
                &format!("PP_RELBETA.{}", i + 1),
                &[
                    ("index", (i + 1).to_string()),
                    ("lll", p.get_l().to_string()),
                    ("jjj", sci(p.get_qn().get_j(), 14)),
                ],
                None,
            )?;
        }

        writer.write(XmlOut::end_element()).map_err(xml_error)?;
    }

    writer.write(XmlOut::end_element()).map_err(xml_error)?;

    Ok(())
}

pub struct Upf2Codec {
    elements: Box<dyn ElementTable>,
}

impl Upf2Codec {
    pub fn new() -> Upf2Codec {
        Upf2Codec::with_elements(Box::new(PeriodicTable))
    }

    pub fn with_elements(elements: Box<dyn ElementTable>) -> Upf2Codec {
        Upf2Codec { elements }
    }
}

impl PspCodec for Upf2Codec {
    fn read(&self, cur: &mut LineCursor, _hint: Format) -> Result<PspData> {
        let doc = Upf2Document::parse(&cur.text())?;

        build(doc, self.elements.as_ref())
    }

    fn write(&self, w: &mut dyn Write, psp: &PspData, _format: Format) -> Result<()> {
        write_document(w, psp, self.elements.as_ref())?;
        writeln!(w)?;

        Ok(())
    }
}
