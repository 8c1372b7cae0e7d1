//! Behavioural properties of the facade, run against the in-process backend
//! so they hold on every host.

use dpapibox::{EphemeralProtector, Facade, FileProtectionError, ProtectionError, WriteMode};
use proptest::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

const FILE_TEXT: &[u8] = b"Hello File Encryption!";

fn facade() -> Facade<EphemeralProtector> {
    Facade::new(EphemeralProtector::new())
}

proptest! {
    #[test]
    fn roundtrip_restores_input(data in proptest::collection::vec(any::<u8>(), 1..2048)) {
        let facade = facade();
        let blob = facade.protect(&data).unwrap();
        prop_assert_eq!(facade.unprotect(&blob).unwrap(), data);
    }

    #[test]
    fn protected_output_never_equals_input(data in proptest::collection::vec(any::<u8>(), 1..256)) {
        let blob = facade().protect(&data).unwrap();
        prop_assert_ne!(blob, data);
    }
}

#[test]
fn test_repeated_protect_differs_but_both_roundtrip() {
    let facade = facade();
    let data = b"Hello DPAPI!";

    let first = facade.protect(data).unwrap();
    let second = facade.protect(data).unwrap();
    assert_ne!(first, second);

    assert_eq!(facade.unprotect(&first).unwrap(), data);
    assert_eq!(facade.unprotect(&second).unwrap(), data);
}

#[test]
fn test_empty_input_rejected() {
    let facade = facade();
    assert_eq!(facade.protect(&[]), Err(ProtectionError::EmptyInput));
    assert_eq!(facade.unprotect(&[]), Err(ProtectionError::EmptyInput));
}

#[test]
fn test_malformed_input_rejected() {
    let err = facade().unprotect(b"this is not encrypted").unwrap_err();
    assert!(matches!(err, ProtectionError::PlatformRejected(_)));
}

#[test]
fn test_blob_from_other_context_rejected() {
    let blob = facade().protect(b"bound to one key").unwrap();
    let err = facade().unprotect(&blob).unwrap_err();
    assert!(matches!(err, ProtectionError::PlatformRejected(_)));
}

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("testfile.txt");
    fs::write(&path, FILE_TEXT).unwrap();
    path
}

#[test]
fn test_file_roundtrip_with_separate_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_fixture(&temp_dir);
    let output = temp_dir.path().join("testfile.txt.enc");
    let facade = facade();

    facade.protect_file(&input, Some(output.as_path())).unwrap();

    let encrypted = fs::read(&output).unwrap();
    assert!(!encrypted.is_empty());
    assert_ne!(encrypted, FILE_TEXT);

    facade.unprotect_file(&output, Some(input.as_path())).unwrap();
    assert_eq!(fs::read(&input).unwrap(), FILE_TEXT);
}

#[test]
fn test_file_roundtrip_overwrite_mode() {
    for mode in [WriteMode::Direct, WriteMode::Atomic] {
        let temp_dir = TempDir::new().unwrap();
        let input = write_fixture(&temp_dir);
        let facade = facade().with_write_mode(mode);

        facade.protect_file(&input, Some(Path::new(""))).unwrap();
        assert_ne!(fs::read(&input).unwrap(), FILE_TEXT);

        facade.unprotect_file(&input, Some(Path::new(""))).unwrap();
        assert_eq!(fs::read(&input).unwrap(), FILE_TEXT, "mode {:?}", mode);
    }
}

#[test]
fn test_missing_file_fails_to_read() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nonexistentfile.txt");
    let facade = facade();

    let err = facade.protect_file(&missing, None).unwrap_err();
    assert!(matches!(err, FileProtectionError::ReadFailed { .. }));

    let err = facade.unprotect_file(&missing, None).unwrap_err();
    assert!(matches!(err, FileProtectionError::ReadFailed { .. }));

    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_concurrent_calls_are_independent() {
    let facade = Arc::new(facade());

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let facade = Arc::clone(&facade);
            thread::spawn(move || {
                let data = vec![i; 64 + usize::from(i)];
                for _ in 0..16 {
                    let blob = facade.protect(&data).unwrap();
                    assert_eq!(facade.unprotect(&blob).unwrap(), data);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_shared_backend_through_arc() {
    let backend = Arc::new(EphemeralProtector::new());
    let sealing = Facade::new(Arc::clone(&backend));
    let opening = Facade::new(backend);

    let blob = sealing.protect(b"shared").unwrap();
    assert_eq!(opening.unprotect(&blob).unwrap(), b"shared");
}

/// Collects every line the crate logs so verbose output can be inspected.
struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.target() == "dpapibox"
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            self.lines.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};

/// Run every operation once, including failing ones, and describe the
/// outcomes in a form that does not depend on random blobs or temp paths.
fn exercise_all_operations() -> Vec<String> {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(EphemeralProtector::new());
    let direct = Facade::new(Arc::clone(&backend));
    let atomic = Facade::new(backend).with_write_mode(WriteMode::Atomic);
    let mut outcomes = Vec::new();

    let blob = direct.protect(FILE_TEXT).unwrap();
    outcomes.push(format!("{:?}", direct.unprotect(&blob)));
    outcomes.push(format!("{:?}", direct.protect(&[])));
    outcomes.push(format!("{:?}", direct.unprotect(b"this is not encrypted")));

    let input = write_fixture(&temp_dir);
    let output = temp_dir.path().join("testfile.txt.enc");
    direct.protect_file(&input, Some(output.as_path())).unwrap();
    direct.unprotect_file(&output, Some(input.as_path())).unwrap();
    outcomes.push(format!("{:?}", fs::read(&input).unwrap()));

    atomic.protect_file(&input, None).unwrap();
    atomic.unprotect_file(&input, None).unwrap();
    outcomes.push(format!("{:?}", fs::read(&input).unwrap()));

    let missing = temp_dir.path().join("nonexistentfile.txt");
    let err = atomic.unprotect_file(&missing, None).unwrap_err();
    assert!(matches!(err, FileProtectionError::ReadFailed { .. }));
    outcomes.push(format!("{:?} {:?}", err.category(), err.path().file_name()));

    fs::write(&input, b"this is not encrypted").unwrap();
    let err = direct.unprotect_file(&input, None).unwrap_err();
    assert!(matches!(err, FileProtectionError::DecryptionFailed { .. }));
    outcomes.push(format!(
        "{:?} {}",
        err.category(),
        err.to_string().starts_with("failed to decrypt")
    ));

    outcomes
}

#[test]
#[serial(verbose)]
fn test_verbose_logging_does_not_change_results() {
    log::set_logger(&LOGGER).expect("logger installed once per test binary");
    log::set_max_level(log::LevelFilter::Info);

    dpapibox::logging::set_verbose(false);
    let quiet = exercise_all_operations();
    assert!(LOGGER.lines.lock().unwrap().is_empty());

    dpapibox::logging::set_verbose(true);
    let verbose = exercise_all_operations();
    dpapibox::logging::set_verbose(false);

    assert_eq!(quiet, verbose);

    let lines = LOGGER.lines.lock().unwrap();
    assert!(lines.iter().any(|line| line.contains("using ephemeral")));
    assert!(lines.iter().any(|line| line.contains("reading file:")));
    assert!(lines.iter().any(|line| line.contains("(Direct)")));
    assert!(lines.iter().any(|line| line.contains("(Atomic)")));
    assert!(lines.iter().any(|line| line == "file decryption successful"));
}
