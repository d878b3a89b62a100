#![allow(dead_code)]

use approx::relative_eq;
use chrono::NaiveDate;
use pspdata::*;

pub const NP: usize = 800;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// r_i = 1e-3 exp(0.0125 i), out to about 22 bohr
pub fn mesh() -> Mesh {
    Mesh::from_parameters(MeshType::LogExp, 0.0125, 1.0e-3, NP).unwrap()
}

pub fn sample<F: Fn(f64) -> f64>(mesh: &Mesh, f: F) -> Vec<f64> {
    mesh.get_rad().iter().map(|&r| f(r)).collect()
}

fn wavefunction(mesh: &Mesh, l: usize) -> Vec<f64> {
    sample(mesh, |r| r.powi(l as i32 + 1) * (-r).exp())
}

fn screened(mesh: &Mesh, zval: f64, rc: f64) -> Vec<f64> {
    sample(mesh, |r| -zval * (1.0 - (-r / rc).exp()) / r)
}

fn beta(mesh: &Mesh, l: usize, width: f64) -> Vec<f64> {
    sample(mesh, |r| r.powi(l as i32 + 1) * (-r * r / width).exp())
}

fn core(mesh: &Mesh) -> Vec<f64> {
    sample(mesh, |r| 0.5 * (-r * r).exp())
}

/// Semi-local dataset with only the fields fhi98pp files carry.
pub fn semilocal(with_core: bool) -> PspData {
    let mesh = mesh();
    let mut psp = PspData::new();

    psp.set_zvalence(4.0);
    psp.set_l_max(1);

    let mut states = Vec::new();
    let mut potentials = Vec::new();
    for l in 0..2 {
        let qn = QuantumNumber::scalar(0, l);
        states.push(State::new(&qn.label(), qn, 0.0, 0.0, &mesh, &wavefunction(&mesh, l)).unwrap());
        potentials.push(Potential::new(qn, &mesh, &screened(&mesh, 4.0, 0.5 + l as f64)).unwrap());
    }
    psp.set_states(states);
    psp.set_potentials(potentials);

    let mut xc = Xc::new(0, 0);
    if with_core {
        xc.set_nlcc(Some(
            Nlcc::new(NlccScheme::Fhi)
                .with_density(&mesh, &core(&mesh))
                .unwrap(),
        ));
    }
    psp.set_xc(xc);

    psp.set_mesh(mesh);

    psp
}

/// Semi-local dataset as an abinit-6 file describes it.
pub fn abinit6() -> PspData {
    let mut psp = semilocal(false);
    let mesh = psp.get_mesh().unwrap().clone();

    psp.set_info("carbon, Troullier-Martins");
    psp.set_z(6.0);
    psp.set_l_local(Some(1));
    psp.set_vlocal(psp.potential_for(1, 0.0).cloned());
    psp.set_xc(
        Xc::new(1, 9).with_nlcc(
            Nlcc::new(NlccScheme::Fhi)
                .with_prefactors(1.2, 0.8, 0.25)
                .with_density(&mesh, &core(&mesh))
                .unwrap(),
        ),
    );
    psp.set_pspinfo(PspInfo {
        date: NaiveDate::from_ymd_opt(2019, 3, 14),
        ..PspInfo::default()
    });

    psp
}

/// Separable dataset: two s projectors, local p channel, core and valence densities.
pub fn separable() -> PspData {
    let mesh = mesh();
    let mut psp = PspData::new();

    psp.set_info("silicon ONCV test");
    psp.set_symbol("Si");
    psp.set_z(14.0);
    psp.set_zvalence(4.0);
    psp.set_l_max(1);
    psp.set_l_local(Some(1));

    psp.set_kb_projectors(vec![
        Projector::new(QuantumNumber::scalar(0, 0), 2.5, &mesh, &beta(&mesh, 0, 1.0)).unwrap(),
        Projector::new(QuantumNumber::scalar(0, 0), -0.75, &mesh, &beta(&mesh, 0, 2.0)).unwrap(),
    ]);

    psp.set_vlocal(Some(
        Potential::new(QuantumNumber::scalar(0, 1), &mesh, &screened(&mesh, 4.0, 1.0)).unwrap(),
    ));

    psp.set_xc(
        Xc::new(101, 130).with_nlcc(
            Nlcc::new(NlccScheme::Abinit)
                .with_prefactors(1.5, 1.0, 0.0)
                .with_density(&mesh, &core(&mesh))
                .unwrap(),
        ),
    );

    psp.set_rho_valence(Some(
        MeshFunc::build(&mesh, &sample(&mesh, |r| 4.0 * r * r * (-2.0 * r).exp())).unwrap(),
    ));

    psp.set_pspinfo(PspInfo {
        date: NaiveDate::from_ymd_opt(2021, 6, 1),
        ..PspInfo::default()
    });

    psp.set_mesh(mesh);

    psp
}

/// Separable dataset with wavefunctions, the shape of a UPF file.
pub fn upf_like() -> PspData {
    let mut psp = separable();
    let mesh = psp.get_mesh().unwrap().clone();

    psp.set_total_energy(-3.75);
    psp.set_info("silicon ONCV test");
    psp.set_pspinfo(PspInfo {
        author: "A. Tester".to_string(),
        code: "ONCVPSP".to_string(),
        date: NaiveDate::from_ymd_opt(2021, 6, 1),
        description: "scalar relativistic".to_string(),
    });
    psp.get_xc_mut().set_nlcc(Some(
        Nlcc::new(NlccScheme::Upf)
            .with_density(&mesh, &core(&mesh))
            .unwrap(),
    ));

    let s = State::new("3S", QuantumNumber::scalar(3, 0), 2.0, -0.40, &mesh, &wavefunction(&mesh, 0)).unwrap();
    let p = State::new("3P", QuantumNumber::scalar(3, 1), 2.0, -0.15, &mesh, &wavefunction(&mesh, 1)).unwrap();
    psp.set_states(vec![s, p]);
    psp.set_nelvalence(4.0);

    psp
}

pub fn close(a: f64, b: f64) -> bool {
    relative_eq!(a, b, epsilon = 1e-10, max_relative = 1e-6)
}

pub fn assert_values_close(what: &str, a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "{}: lengths differ", what);

    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!(close(*x, *y), "{}[{}]: {} != {}", what, i, x, y);
    }
}

pub fn assert_funcs_close(what: &str, a: &MeshFunc, b: &MeshFunc) {
    assert_values_close(what, a.get_values(), b.get_values());
}

pub fn assert_mesh_close(a: &PspData, b: &PspData) {
    let (ma, mb) = (a.get_mesh().unwrap(), b.get_mesh().unwrap());

    assert_values_close("r", ma.get_rad(), mb.get_rad());
    assert_values_close("rab", ma.get_rab(), mb.get_rab());
}

/// Every field both datasets carry, compared to 1e-6 relative.
pub fn assert_psp_close(a: &PspData, b: &PspData) {
    assert_mesh_close(a, b);

    assert!(close(a.get_z(), b.get_z()));
    assert!(close(a.get_zvalence(), b.get_zvalence()));
    assert_eq!(a.get_l_max(), b.get_l_max());
    assert_eq!(a.get_l_local(), b.get_l_local());
    assert_eq!(a.get_xc().get_pair(), b.get_xc().get_pair());

    assert_eq!(a.get_n_states(), b.get_n_states());
    for (sa, sb) in a.get_states().iter().zip(b.get_states().iter()) {
        assert_eq!(sa.get_qn().key(), sb.get_qn().key());
        assert!(close(sa.get_occ(), sb.get_occ()));
        assert_funcs_close("wavefunction", sa.get_wf(), sb.get_wf());
    }

    assert_eq!(a.get_n_potentials(), b.get_n_potentials());
    for (pa, pb) in a.get_potentials().iter().zip(b.get_potentials().iter()) {
        assert_eq!(pa.get_qn().lj_key(), pb.get_qn().lj_key());
        assert_funcs_close("potential", pa.get_v(), pb.get_v());
    }

    assert_eq!(a.get_n_kbproj(), b.get_n_kbproj());
    for (pa, pb) in a.get_kb_projectors().iter().zip(b.get_kb_projectors().iter()) {
        assert_eq!(pa.get_l(), pb.get_l());
        assert!(close(pa.get_energy(), pb.get_energy()));
        assert_funcs_close("projector", pa.get_proj(), pb.get_proj());
    }

    match (a.get_vlocal(), b.get_vlocal()) {
        (Some(va), Some(vb)) => assert_funcs_close("local potential", va.get_v(), vb.get_v()),
        (None, None) => {}
        _ => panic!("local potential present on one side only"),
    }

    match (a.get_xc().get_core_density(), b.get_xc().get_core_density()) {
        (Some(ca), Some(cb)) => assert_funcs_close("core density", ca, cb),
        (None, None) => {}
        _ => panic!("core density present on one side only"),
    }

    match (a.get_rho_valence(), b.get_rho_valence()) {
        (Some(ra), Some(rb)) => assert_funcs_close("valence density", ra, rb),
        (None, None) => {}
        _ => panic!("valence density present on one side only"),
    }
}
