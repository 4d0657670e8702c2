use assert_fs::prelude::*;
use assert_fs::TempDir;
use maplit::hashset;

use ocfl_core::ocfl::{DigestAlgorithm, Object, ObjectConfig};

fn write(tmp: &TempDir, path: &str, contents: &str) {
    tmp.child(path).write_str(contents).unwrap();
}

// S2. Plain directory -> object.
#[test]
fn initialize_moves_existing_contents_under_v1_content() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.xml", "<a/>");
    write(&tmp, "level1/level2/bar.txt", "bar");

    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, Some("first version".to_string())).unwrap();

    assert!(tmp.path().join("0=ocfl_object_1.0").exists());
    assert_eq!("<a/>", std::fs::read_to_string(tmp.path().join("v1/content/foo.xml")).unwrap());
    assert_eq!(
        "bar",
        std::fs::read_to_string(tmp.path().join("v1/content/level1/level2/bar.txt")).unwrap()
    );

    let inventory = object.inventory.as_ref().unwrap();
    assert_eq!("v1", inventory.head);
    assert_eq!(1, inventory.version_numbers().len());
    assert_eq!(
        Some(&"first version".to_string()),
        inventory.version_entry(1u32).unwrap().message.as_ref()
    );

    let logical_paths: std::collections::HashSet<String> = inventory
        .version_entry(1u32)
        .unwrap()
        .state
        .values()
        .flatten()
        .cloned()
        .collect();
    assert_eq!(
        hashset! { "foo.xml".to_string(), "level1/level2/bar.txt".to_string() },
        logical_paths
    );
}

#[test]
fn initialize_twice_fails_on_an_existing_object() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.txt", "data");

    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    let mut reopened = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    let result = reopened.initialize(Some("o2".to_string()), None, None);
    assert!(result.is_err());
}

fn setup_three_version_object(tmp: &TempDir) -> Object {
    write(tmp, "foo.xml", "shared-content");
    write(tmp, "level1/level2/bar.txt", "also-shared");

    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    // v2 repeats both files' content verbatim under a different layout.
    write(tmp, "v2/content/foo.xml", "shared-content");
    write(tmp, "v2/content/level100/level200/bar.txt", "also-shared");
    object.update(true, true, false).unwrap();

    // v3 adds genuinely new content.
    write(tmp, "v3/content/foo.xml", "v3-unique-foo");
    write(tmp, "v3/content/penny.txt", "v3-unique-penny");
    object.update(true, true, false).unwrap();

    object
}

// S4. Forward-delta reconciliation.
#[test]
fn reconcile_deltas_prunes_ancestor_duplicates_but_keeps_new_content() {
    let tmp = TempDir::new().unwrap();
    let object = setup_three_version_object(&tmp);

    // v2's duplicated bytes were deleted; v2's empty directory tree was pruned.
    assert!(!tmp.path().join("v2/content/foo.xml").exists());
    assert!(!tmp.path().join("v2/content/level100/level200/bar.txt").exists());
    assert!(!tmp.path().join("v2/content/level100").exists());

    // v3's unique content is untouched.
    assert!(tmp.path().join("v3/content/foo.xml").exists());
    assert!(tmp.path().join("v3/content/penny.txt").exists());

    let inventory = object.inventory.as_ref().unwrap();
    let shared_digest = DigestAlgorithm::Sha256.hash_bytes(b"shared-content");
    let physical = &inventory.manifest[&shared_digest];
    assert_eq!(1, physical.len());
    assert!(physical[0].starts_with("v1/"));

    let unique_digest = DigestAlgorithm::Sha256.hash_bytes(b"v3-unique-foo");
    assert!(inventory.manifest[&unique_digest][0].starts_with("v3/"));
}

// S5. Checkout of sparse versions.
#[test]
fn checkout_reconstructs_logical_state_of_a_version_with_pruned_physical_content() {
    let tmp = TempDir::new().unwrap();
    setup_three_version_object(&tmp);

    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();

    let out = TempDir::new().unwrap();
    object.checkout(out.path(), true, Some(2u32)).unwrap();

    assert_eq!(
        "shared-content",
        std::fs::read_to_string(out.path().join("foo.xml")).unwrap()
    );
    assert_eq!(
        "also-shared",
        std::fs::read_to_string(out.path().join("level100/level200/bar.txt")).unwrap()
    );
}

#[test]
fn checkout_with_no_version_selects_the_head() {
    let tmp = TempDir::new().unwrap();
    setup_three_version_object(&tmp);
    let object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();

    let out = TempDir::new().unwrap();
    object.checkout::<u32>(out.path(), true, None).unwrap();

    assert_eq!(
        "v3-unique-foo",
        std::fs::read_to_string(out.path().join("foo.xml")).unwrap()
    );
    assert_eq!(
        "v3-unique-penny",
        std::fs::read_to_string(out.path().join("penny.txt")).unwrap()
    );
}

#[test]
fn checkout_into_an_existing_file_is_a_path_conflict() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.txt", "x");
    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    let out = TempDir::new().unwrap();
    let target = out.child("not-a-dir");
    target.write_str("occupied").unwrap();

    let result = object.checkout::<u32>(target.path(), true, None);
    assert!(result.is_err());
}

#[test]
fn update_is_idempotent_on_a_settled_object() {
    let tmp = TempDir::new().unwrap();
    write(&tmp, "foo.txt", "data");
    let mut object = Object::new(tmp.path(), ObjectConfig::default()).unwrap();
    object.initialize(Some("o1".to_string()), None, None).unwrap();

    let inventory_bytes_1 = std::fs::read(tmp.path().join("inventory.json")).unwrap();
    object.update(true, true, false).unwrap();
    let inventory_bytes_2 = std::fs::read(tmp.path().join("inventory.json")).unwrap();

    assert_eq!(inventory_bytes_1, inventory_bytes_2);
}
