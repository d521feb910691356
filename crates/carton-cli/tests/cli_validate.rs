use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn carton_cmd() -> Command {
    Command::cargo_bin("carton").unwrap()
}

#[test]
fn test_validate_clean_manifests() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("Cartfile"),
        "github \"ReactiveCocoa/ReactiveCocoa\" >= 2.3.1\ngithub \"Mantle/Mantle\" ~> 1.0\n",
    )
    .unwrap();
    fs::write(tmp.path().join("Cartfile.private"), "github \"Quick/Quick\"\n").unwrap();

    carton_cmd()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "3 dependencies in Cartfile and Cartfile.private",
        ));
}

#[test]
fn test_validate_reports_duplicates() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("Cartfile"),
        "github \"self2/self2\"\ngithub \"self2/self2\" ~> 1.0\ngithub \"other/other\"\n",
    )
    .unwrap();

    carton_cmd()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate dependencies: self2/self2"));
}

#[test]
fn test_validate_reports_cross_duplicates() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Cartfile"), "github \"1/1\"\ngithub \"2/2\"\n").unwrap();
    fs::write(tmp.path().join("Cartfile.private"), "github \"1/1\"\n").unwrap();

    carton_cmd()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Duplicate dependencies: 1/1"));
}

#[test]
fn test_validate_reports_parse_errors() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("Cartfile"),
        "github \"A/A\"\nsvn \"B/B\"\n",
    )
    .unwrap();

    carton_cmd()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Parse error on line 2"));
}

#[test]
fn test_validate_without_cartfile_fails() {
    let tmp = TempDir::new().unwrap();

    carton_cmd()
        .current_dir(tmp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Cartfile found"));
}

#[test]
fn test_validate_from_subdirectory_uses_nearest_cartfile() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Cartfile"), "github \"Mantle/Mantle\" ~> 1.0\n").unwrap();
    let nested = tmp.path().join("Sources").join("App");
    fs::create_dir_all(&nested).unwrap();

    carton_cmd()
        .current_dir(&nested)
        .arg("validate")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 dependencies in Cartfile"));
}
