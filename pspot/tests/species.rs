use pspdata::*;
use pspot::PSPot;

use std::fs;

fn dataset(symbol: &str, l_max: usize) -> PspData {
    let mesh = Mesh::from_parameters(MeshType::LogExp, 0.02, 1.0e-3, 500).unwrap();
    let r = mesh.get_rad();

    let beta: Vec<f64> = r.iter().map(|r| r * (-r * r).exp()).collect();
    let vloc: Vec<f64> = r.iter().map(|r| -4.0 * (1.0 - (-r).exp()) / r).collect();
    let u: Vec<f64> = r.iter().map(|r| r * (-r).exp()).collect();

    let mut psp = PspData::new();

    psp.set_symbol(symbol);
    psp.set_info(&format!("{} test potential", symbol));
    psp.set_zvalence(4.0);
    psp.set_l_max(l_max);
    psp.set_l_local(Some(l_max));
    psp.set_xc(Xc::new(1, 12));
    psp.set_kb_projectors(vec![
        Projector::new(QuantumNumber::scalar(0, 0), 1.5, &mesh, &beta).unwrap(),
    ]);
    psp.set_vlocal(Some(
        Potential::new(QuantumNumber::scalar(0, l_max), &mesh, &vloc).unwrap(),
    ));
    psp.set_states(vec![
        State::new("2S", QuantumNumber::scalar(2, 0), 2.0, -0.5, &mesh, &u).unwrap(),
    ]);
    psp.set_mesh(mesh);

    psp
}

#[test]
fn test_two_species_table() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = std::env::temp_dir().join(format!("pspot-species-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    atompsp::write_file(dir.join("C.upf"), &dataset("C", 1), Format::Upf).unwrap();
    atompsp::write_file(dir.join("Si.psp8"), &dataset("Si", 2), Format::Abinit(8)).unwrap();

    let table = "# species  file  [format]\nC   C.upf\nSi  Si.psp8  abinit-8\n";
    fs::write(dir.join("in.pot"), table).unwrap();

    let pots = PSPot::from_file(dir.join("in.pot")).unwrap();
    pots.display();

    assert_eq!(pots.get_species(), vec!["C", "Si"]);
    assert_eq!(pots.get_psp("C").unwrap().get_format_guessed(), Format::Upf);
    assert_eq!(pots.get_psp("Si").unwrap().get_format_guessed(), Format::Abinit(8));
    assert_eq!(pots.get_max_lmax(), 2);
    assert!(pots.get_psp("O").is_none());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_file() {
    let dir = std::env::temp_dir().join(format!("pspot-missing-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("in.pot"), "C  C.upf\n").unwrap();

    assert!(matches!(
        PSPot::from_file(dir.join("in.pot")),
        Err(psperror::PspError::Io(_))
    ));

    fs::remove_dir_all(&dir).unwrap();
}
