use assert_fs::prelude::*;
use assert_fs::TempDir;

use ocfl_core::ocfl::{DigestAlgorithm, FixityReport, Object, ObjectConfig, StorageRoot, StorageRootConfig};

fn write(tmp: &TempDir, path: &str, contents: &str) {
    tmp.child(path).write_str(contents).unwrap();
}

// S6. Fixity round-trip and corruption detection.
#[test]
fn calc_then_check_fixity_round_trips() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.xml", "original");

    let mut config = ObjectConfig::default();
    config.fixity_algo = Some(DigestAlgorithm::Sha512);

    let mut object = Object::new(tmp.path(), config).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    object
        .calc_fixity(false, Some(DigestAlgorithm::Sha512), true)
        .unwrap();

    let report = object.check_fixity(Some(DigestAlgorithm::Sha512), false).unwrap();
    assert_eq!(FixityReport::Ok, report);
}

#[test]
fn corrupting_a_file_surfaces_it_in_the_failures_map() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.xml", "original");

    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();
    object
        .calc_fixity(false, Some(DigestAlgorithm::Sha256), true)
        .unwrap();

    // Bit-rot: overwrite the physical content bytes without going through the API.
    write(&tmp, "v1/content/foo.xml", "corrupted");

    let report = object.check_fixity(Some(DigestAlgorithm::Sha256), false).unwrap();
    match report {
        FixityReport::Failures(failures) => {
            let affected_paths: Vec<&String> = failures.values().flatten().collect();
            assert!(affected_paths.iter().any(|p| p.as_str() == "foo.xml"));
        }
        other => panic!("expected a failures report, got {:?}", other),
    }
}

#[test]
fn check_fixity_without_a_prior_calc_reports_missing_algorithm() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.xml", "data");
    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    let report = object.check_fixity(Some(DigestAlgorithm::Blake2b512), false).unwrap();
    assert_eq!(
        FixityReport::NoDigestsForAlgorithm(DigestAlgorithm::Blake2b512),
        report
    );
}

#[test]
fn use_manifest_digest_aliases_the_manifest_under_the_fixity_algorithm() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.xml", "data");
    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    let digests = object.calc_fixity(true, None, true).unwrap();
    assert_eq!(&digests, &object.inventory.as_ref().unwrap().manifest);

    let report = object.check_fixity(None, true).unwrap();
    assert_eq!(FixityReport::Ok, report);
}

#[test]
fn storage_root_folds_fixity_checks_over_every_object() {
    let tmp = TempDir::new().unwrap();
    let mut config = StorageRootConfig::default();
    config.object_config.fixity_algo = Some(DigestAlgorithm::Sha256);
    let root = StorageRoot::new(tmp.child("sr").path(), config, None).unwrap();

    for id in ["a", "b"] {
        let raw = tmp.child(id);
        raw.child("f.txt").write_str("same-content").unwrap();
        let mut object = Object::new(raw.path(), root.config().object_config.clone()).unwrap();
        object.initialize(Some(id.to_string()), None, None).unwrap();
        object
            .calc_fixity(false, Some(DigestAlgorithm::Sha256), true)
            .unwrap();
        root.add_object(&mut object, None).unwrap();
    }

    let reports = root.check_fixity(Some(DigestAlgorithm::Sha256), false).unwrap();
    assert_eq!(2, reports.len());
    assert!(reports.iter().all(|(_, report)| report.is_ok()));
}
