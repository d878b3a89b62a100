mod common;

use atompsp::*;
use common::*;
use itertools::Itertools;
use pspdata::*;
use psperror::PspError;

const FAMILIES: [Family; 4] = [Family::Upf, Family::Upf2, Family::Abinit, Family::Fhi];

fn text(psp: &PspData, format: Format) -> LineCursor {
    let mut buf: Vec<u8> = Vec::new();
    write_dataset(&mut buf, psp, format).unwrap();

    LineCursor::from_reader(buf.as_slice()).unwrap()
}

#[test]
fn test_detection_is_order_independent() {
    init();

    let samples = vec![
        (text(&upf_like(), Format::Upf), Format::Upf),
        (text(&upf_like(), Format::Upf2), Format::Upf2),
        (text(&abinit6(), Format::Abinit(6)), Format::Abinit(6)),
        (text(&separable(), Format::Abinit(8)), Format::Abinit(8)),
        (text(&semilocal(true), Format::Fhi), Format::Fhi),
    ];

    for order in FAMILIES.iter().cloned().permutations(FAMILIES.len()) {
        let dispatcher = Dispatcher::with_order(&order).unwrap();

        for (lines, expected) in samples.iter() {
            let psp = dispatcher.read(lines, Format::Unknown).unwrap();
            assert_eq!(psp.get_format_guessed(), *expected, "order {:?}", order);
        }
    }
}

#[test]
fn test_detected_dataset_matches_explicit_read() {
    init();

    let lines = text(&separable(), Format::Abinit(8));
    let dispatcher = Dispatcher::new();

    let guessed = dispatcher.read(&lines, Format::Unknown).unwrap();
    let explicit = dispatcher.read(&lines, Format::Abinit(8)).unwrap();

    assert_psp_close(&explicit, &guessed);
}

#[test]
fn test_explicit_hint_surfaces_the_reader_error() {
    let lines = text(&semilocal(false), Format::Fhi);

    let err = Dispatcher::new().read(&lines, Format::Upf).unwrap_err();
    assert!(matches!(err, PspError::MalformedFormat(_)));
}

#[test]
fn test_abinit_hint_must_match_pspcod() {
    let lines = text(&separable(), Format::Abinit(8));

    let err = Dispatcher::new().read(&lines, Format::Abinit(6)).unwrap_err();
    assert!(matches!(err, PspError::MalformedFormat(_)));
}

#[test]
fn test_truncated_file_is_unrecognized() {
    let lines = text(&separable(), Format::Abinit(8));
    let full = lines.text();
    let truncated: Vec<&str> = full.lines().take(40).collect();

    let cur = LineCursor::from_text(&truncated.join("\n"));

    match Dispatcher::new().read(&cur, Format::Unknown) {
        Err(PspError::UnrecognizedFormat { attempts }) => {
            assert_eq!(attempts.len(), 4);
            assert!(attempts[2].starts_with("abinit:"));
        }
        other => panic!("expected UnrecognizedFormat, got {:?}", other.map(|p| p.get_format_guessed())),
    }
}

#[test]
fn test_empty_input_is_unrecognized() {
    let err = read_dataset("".as_bytes(), Format::Unknown).unwrap_err();

    assert!(matches!(err, PspError::UnrecognizedFormat { .. }));
}
