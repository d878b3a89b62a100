mod common;

use atompsp::*;
use common::*;
use pspconsts::{HA_TO_RY, RY_TO_HA};
use pspdata::*;
use psperror::PspError;

const MINIMAL_UPF: &str = r#"<PP_INFO>
  hydrogen, six points
</PP_INFO>
<PP_HEADER>
   0                   Version Number
  H                    Element
   NC                  Norm - Conserving pseudopotential
    F                  Nonlinear Core Correction
 SLA PZ NOGX NOGC     PZ Exchange-Correlation functional
    1.00000000000E+00    Z valence
   -0.90000000000E+00    Total energy
    0.0000000    0.0000000    Suggested cutoff for wfc and rho
    1                  Max angular momentum component
    6                  Number of points in mesh
    1    1             Number of Wavefunctions, Number of Projectors
 Wavefunctions         nl  l   occ
                       1S  0  1.00
</PP_HEADER>
<PP_MESH>
  <PP_R>
  1.0E-02  2.0E-02  4.0E-02  8.0E-02
  1.6E-01  3.2E-01
  </PP_R>
  <PP_RAB>
  6.931471805599E-03  1.386294361120E-02  2.772588722240E-02  5.545177444480E-02
  1.109035488896E-01  2.218070977792E-01
  </PP_RAB>
</PP_MESH>
<PP_LOCAL>
  -2.0  -2.0  -2.0  -1.9
  -1.8  -1.5
</PP_LOCAL>
<PP_NONLOCAL>
  <PP_BETA>
    1    0             Beta    L
     4
  1.0  2.0  3.0  4.0
  </PP_BETA>
  <PP_DIJ>
    1                  Number of nonzero Dij
    1    1    1.0E+00
  </PP_DIJ>
</PP_NONLOCAL>
<PP_PSWFC>
1S    0  1.00          Wavefunction
  0.01  0.02  0.04  0.08
  0.15  0.25
</PP_PSWFC>
<PP_RHOATOM>
  1.0E-04  4.0E-04  1.6E-03  6.4E-03
  2.25E-02  6.25E-02
</PP_RHOATOM>
"#;

fn read_upf(text: &str) -> psperror::Result<PspData> {
    read_dataset(text.as_bytes(), Format::Upf)
}

#[test]
fn test_minimal_upf() {
    init();

    let psp = read_upf(MINIMAL_UPF).unwrap();
    let mesh = psp.get_mesh().unwrap();

    assert_eq!(psp.get_symbol(), "H");
    assert_eq!(psp.get_z(), 1.0);
    assert_eq!(mesh.get_np(), 6);
    assert!(close(mesh.r_max(), 0.32));
    assert_eq!(psp.get_xc().get_pair(), (1, 9));
    assert!(close(psp.get_total_energy(), -0.9 * RY_TO_HA));
    assert!(close(psp.get_nelvalence(), 1.0));
    assert_eq!(psp.get_l_local(), Some(1));

    // a six-point table read from lines of four
    let vloc = psp.get_vlocal().unwrap().get_v().get_values();
    assert!(close(vloc[5], -1.5 * RY_TO_HA));
    assert_eq!(psp.get_vlocal().unwrap().get_qn().get_l(), 1);

    let beta = psp.get_kb_projectors()[0].get_proj().get_values();
    assert!(close(beta[3], 4.0 * RY_TO_HA));
    assert_eq!(&beta[4..], &[0.0, 0.0]);
    assert!(close(psp.get_kb_projectors()[0].get_energy(), HA_TO_RY));

    let state = &psp.get_states()[0];
    assert_eq!(state.get_qn().get_n(), 1);
    assert!(close(state.get_wf().get_values()[5], 0.25));

    assert!(psp.validate().is_ok());
}

#[test]
fn test_minimal_upf_is_detected() {
    let psp = read_dataset(MINIMAL_UPF.as_bytes(), Format::Unknown).unwrap();

    assert_eq!(psp.get_format_guessed(), Format::Upf);
}

#[test]
fn test_unknown_element_is_corrupt() {
    let text = MINIMAL_UPF.replace("  H                    Element", "  Qq                   Element");

    assert!(matches!(read_upf(&text), Err(PspError::Corrupt(_))));
}

/// Isotope labels for hydrogen, everything else unknown.
struct Isotopes;

impl ElementTable for Isotopes {
    fn symbol_to_z(&self, symbol: &str) -> psperror::Result<u32> {
        match symbol.trim() {
            "H" | "D" | "T" => Ok(1),
            other => Err(PspError::corrupt(format!("unknown element '{}'", other))),
        }
    }

    fn z_to_symbol(&self, z: u32) -> psperror::Result<String> {
        match z {
            1 => Ok("H".to_string()),
            _ => Err(PspError::invalid(format!("no element with z = {}", z))),
        }
    }
}

#[test]
fn test_custom_element_table() {
    let text = MINIMAL_UPF.replace("  H                    Element", "  D                    Element");
    let codec = UpfCodec::with_elements(Box::new(Isotopes));

    let psp = codec.read(&mut LineCursor::from_text(&text), Format::Upf).unwrap();
    assert_eq!(psp.get_symbol(), "D");
    assert_eq!(psp.get_z(), 1.0);

    let doc = minimal_upf2("NC", "1.0", 1).replace(r#"element="H""#, r#"element="T""#);
    let psp = Upf2Codec::with_elements(Box::new(Isotopes))
        .read(&mut LineCursor::from_text(&doc), Format::Upf2)
        .unwrap();
    assert_eq!(psp.get_z(), 1.0);

    assert!(matches!(
        read_upf2(&doc.replace(r#"element="T""#, r#"element="Tq""#)),
        Err(PspError::Corrupt(_))
    ));
}

#[test]
fn test_wavefunction_count_overflow() {
    let text = MINIMAL_UPF.replace(
        "    1    1             Number of Wavefunctions",
        &format!("    {}    1             Number of Wavefunctions", usize::MAX),
    );

    assert!(matches!(read_upf(&text), Err(PspError::Corrupt(_))));
}

#[test]
fn test_tags_are_case_insensitive() {
    let text = MINIMAL_UPF.replace("<PP_", "<pp_").replace("</PP_", "</pp_");

    let psp = read_upf(&text).unwrap();
    assert_eq!(psp.get_mesh().unwrap().get_np(), 6);
}

#[test]
fn test_ultrasoft_is_unsupported() {
    let text = MINIMAL_UPF.replace("   NC                  Norm", "   US                  Ultrasoft");

    assert!(matches!(read_upf(&text), Err(PspError::Unsupported(_))));
}

#[test]
fn test_off_diagonal_dij_is_inconsistent() {
    let text = MINIMAL_UPF.replace("    1    1    1.0E+00", "    1    2    1.0E+00");

    assert!(matches!(read_upf(&text), Err(PspError::Inconsistent(_))));
}

#[test]
fn test_missing_close_tag() {
    let text = MINIMAL_UPF.replace("</PP_LOCAL>\n", "");

    assert!(matches!(read_upf(&text), Err(PspError::MalformedFormat(_))));
}

#[test]
fn test_short_block() {
    let text = MINIMAL_UPF.replace("  -1.8  -1.5\n", "  -1.8\n");

    assert!(matches!(read_upf(&text), Err(PspError::MalformedFormat(_))));
}

#[test]
fn test_beta_longer_than_mesh() {
    let text = MINIMAL_UPF.replace("     4\n", "     9\n");

    assert!(matches!(read_upf(&text), Err(PspError::Inconsistent(_))));
}

#[test]
fn test_rhoatom_from_wavefunctions() {
    init();

    let mut psp = upf_like();
    psp.set_rho_valence(None);

    let mut buf: Vec<u8> = Vec::new();
    write_dataset(&mut buf, &psp, Format::Upf).unwrap();
    let back = read_dataset(buf.as_slice(), Format::Upf).unwrap();

    let expected: Vec<f64> = psp
        .get_mesh()
        .unwrap()
        .get_rad()
        .iter()
        .map(|&r| {
            psp.get_states()
                .iter()
                .map(|s| s.get_occ() * s.wf_eval(r).powi(2))
                .sum::<f64>()
        })
        .collect();

    assert_values_close("rhoatom", back.get_rho_valence().unwrap().get_values(), &expected);
}

fn minimal_upf2(pseudo_type: &str, dij: &str, nproj: usize) -> String {
    let betas: String = (1..=nproj)
        .map(|i| {
            format!(
                "    <PP_BETA.{} index=\"{}\" angular_momentum=\"0\">1.0 2.0 3.0</PP_BETA.{}>\n",
                i, i, i
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<UPF version="2.0.1">
  <PP_INFO>hydrogen, six points</PP_INFO>
  <PP_HEADER element="H" pseudo_type="{}" relativistic="scalar" is_ultrasoft="F" is_paw="F"
    core_correction="F" functional="PBE" z_valence="1.0" total_psenergy="-0.9"
    l_max="1" l_local="-1" mesh_size="6" number_of_wfc="1" number_of_proj="{}"/>
  <PP_MESH>
    <PP_R type="real" size="6">1.0E-02 2.0E-02 4.0E-02 8.0E-02
      1.6E-01 3.2E-01</PP_R>
    <PP_RAB type="real" size="6">6.931471805599E-03 1.386294361120E-02 2.772588722240E-02
      5.545177444480E-02 1.109035488896E-01 2.218070977792E-01</PP_RAB>
  </PP_MESH>
  <PP_LOCAL>-2.0 -2.0 -2.0 -1.9 -1.8 -1.5</PP_LOCAL>
  <PP_NONLOCAL>
{}    <PP_DIJ>{}</PP_DIJ>
  </PP_NONLOCAL>
  <PP_PSWFC>
    <PP_CHI.1 label="1S" l="0" occupation="1.0" pseudo_energy="-0.5">0.01 0.02 0.04 0.08 0.15 0.25</PP_CHI.1>
  </PP_PSWFC>
  <PP_RHOATOM>1.0E-04 4.0E-04 1.6E-03 6.4E-03 2.25E-02 6.25E-02</PP_RHOATOM>
</UPF>
"#,
        pseudo_type, nproj, betas, dij
    )
}

fn read_upf2(text: &str) -> psperror::Result<PspData> {
    read_dataset(text.as_bytes(), Format::Upf2)
}

#[test]
fn test_minimal_upf2() {
    init();

    let psp = read_upf2(&minimal_upf2("NC", "1.0", 1)).unwrap();

    assert_eq!(psp.get_symbol(), "H");
    assert_eq!(psp.get_z(), 1.0);
    assert_eq!(psp.get_xc().get_pair(), (101, 130));
    assert_eq!(psp.get_wave_eq(), WaveEq::ScalarRelativistic);
    assert_eq!(psp.get_l_local(), None);
    assert_eq!(psp.get_vlocal().unwrap().get_qn().get_l(), 2);
    assert!(close(psp.get_states()[0].get_eigenval(), -0.25));
    assert_eq!(psp.get_states()[0].get_qn().get_n(), 1);

    let beta = psp.get_kb_projectors()[0].get_proj().get_values();
    assert_eq!(beta.len(), 6);
    assert!(close(beta[2], 1.5));
    assert_eq!(beta[5], 0.0);

    let detected = read_dataset(minimal_upf2("NC", "1.0", 1).as_bytes(), Format::Unknown).unwrap();
    assert_eq!(detected.get_format_guessed(), Format::Upf2);
}

#[test]
fn test_upf2_rejects_paw_and_ultrasoft() {
    for kind in ["US", "PAW"].iter() {
        let err = read_upf2(&minimal_upf2(kind, "1.0", 1)).unwrap_err();
        assert!(matches!(err, PspError::Unsupported(_)));
    }
}

#[test]
fn test_upf2_off_diagonal_dij() {
    let err = read_upf2(&minimal_upf2("NC", "1.0 0.5 0.5 1.0", 2)).unwrap_err();

    assert!(matches!(err, PspError::Inconsistent(_)));
}

#[test]
fn test_upf2_projector_count_mismatch() {
    let text = minimal_upf2("NC", "1.0", 1).replace("number_of_proj=\"1\"", "number_of_proj=\"2\"");

    assert!(matches!(read_upf2(&text), Err(PspError::Inconsistent(_))));
}

#[test]
fn test_upf2_requires_version_2() {
    let text = minimal_upf2("NC", "1.0", 1).replace("version=\"2.0.1\"", "version=\"1.0.0\"");

    assert!(matches!(read_upf2(&text), Err(PspError::MalformedFormat(_))));
}

#[test]
fn test_upf2_broken_xml() {
    let text = minimal_upf2("NC", "1.0", 1).replace("</PP_LOCAL>", "");

    assert!(matches!(read_upf2(&text), Err(PspError::Xml(_))));
}
