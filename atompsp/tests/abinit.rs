mod common;

use atompsp::*;
use common::*;
use pspdata::*;
use psperror::PspError;

const CARBON_HEADER: &str = "Carbon test\n6.00 4.00\n4 1 2 0 50 0.0\n0.0 0.0 0.0\n";

const NP: usize = 50;
const AMESH: f64 = 1.0247;

fn radius(i: usize) -> f64 {
    5.0e-4 * AMESH.powi(i as i32)
}

/// The carbon header as an abinit-6 file, followed by a three-channel
/// fhi98pp body on a 50-point logarithmic mesh.
fn carbon_psp6() -> String {
    let mut text = CARBON_HEADER.replacen("4 1 2 0 50", "6 1 2 0 50", 1);

    text.push_str("5--- free text\n6\n7-Here follows the cpi file from the fhi98pp code-\n");
    text.push_str("4.0000000000000E+00   3\n");
    for _ in 0..10 {
        text.push_str("  0.0000    0.0000    0.0000   0.0000\n");
    }

    for l in 0..3 {
        text.push_str(&format!("{}   {}\n", NP, AMESH));

        for i in 0..NP {
            let r = radius(i);
            let u = r.powi(l + 1) * (-r).exp();
            let v = -4.0 * (1.0 - (-r / (0.5 + l as f64)).exp()) / r;

            text.push_str(&format!("{:5} {:.12e} {:.12e} {:.12e}\n", i + 1, r, u, v));
        }
    }

    text
}

#[test]
fn test_carbon_header_variant_is_unsupported() {
    init();

    let err = read_dataset(CARBON_HEADER.as_bytes(), Format::Abinit(4)).unwrap_err();

    assert!(matches!(err, PspError::Unsupported(_)));
}

#[test]
fn test_carbon_psp6_read_dataset() {
    init();

    let psp = read_dataset(carbon_psp6().as_bytes(), Format::Unknown).unwrap();

    assert_eq!(psp.get_format_guessed(), Format::Abinit(6));
    assert_eq!(psp.get_info(), "Carbon test");
    assert_eq!(psp.get_z(), 6.0);
    assert_eq!(psp.get_zvalence(), 4.0);
    assert_eq!(psp.get_l_max(), 2);
    assert_eq!(psp.get_l_local(), Some(0));
    assert_eq!(psp.get_xc().get_pair(), (20, 0));
    assert!(!psp.get_xc().has_nlcc());

    let mesh = psp.get_mesh().unwrap();
    assert_eq!(mesh.get_np(), NP);
    assert!(close(mesh.r_min(), radius(0)));
    assert!(close(mesh.r_max(), radius(NP - 1)));

    assert_eq!(psp.get_n_states(), 3);
    assert_eq!(psp.get_n_potentials(), 3);
    for l in 0..3 {
        let r = radius(10);
        let v = psp.potential_for(l, 0.0).unwrap();

        assert_eq!(v.get_qn().get_l(), l);
        assert!(close(
            v.get_v().get_values()[10],
            -4.0 * (1.0 - (-r / (0.5 + l as f64)).exp()) / r
        ));
        assert_eq!(psp.get_states()[l].get_qn().get_l(), l);
    }

    let vlocal = psp.get_vlocal().unwrap();
    assert_eq!(vlocal.get_qn().get_l(), 0);
    assert_funcs_close(
        "local potential",
        vlocal.get_v(),
        psp.potential_for(0, 0.0).unwrap().get_v(),
    );

    assert!(psp.validate().is_ok());
}
