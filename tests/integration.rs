use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use walkdir::WalkDir;

/// Copy a fixture tree into a fresh temp dir so commands can rewrite it.
fn fixture(name: &str) -> tempfile::TempDir {
    let source = Path::new("tests/fixtures").join(name);
    let dir = tempfile::tempdir().unwrap();
    for entry in WalkDir::new(&source).into_iter().filter_map(Result::ok) {
        let relative = entry.path().strip_prefix(&source).unwrap();
        let target = dir.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

fn projref(args: &[&str], root: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_projref"))
        .args(args)
        .arg(root)
        .output()
        .unwrap()
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn clean_rewrites_legacy_project_into_canonical_form() {
    let dir = fixture("solution");
    std::fs::create_dir_all(dir.path().join("packages/Newtonsoft.Json.12.0.1/lib/net45")).unwrap();
    let sdk_before = read(dir.path().join("Lib/Lib.csproj"));

    let clean = projref(&["clean"], dir.path());
    let stderr = String::from_utf8_lossy(&clean.stderr);
    assert!(clean.status.success(), "clean failed: {stderr}");

    assert_eq!(read(dir.path().join("App/App.csproj")), read(PathBuf::from("tests/fixtures/expected/App.csproj")));
    assert_eq!(read(dir.path().join("Lib/Lib.csproj")), sdk_before, "sdk-style project must be untouched");

    assert!(stderr.contains("duplicate `Newtonsoft.Json` 11.0.0.0"), "missing duplicate report: {stderr}");
    assert!(stderr.contains("suspicious hint path for `Newtonsoft.Json` 11.0.0.0"), "missing hint report: {stderr}");
    assert!(!stderr.contains("suspicious hint path for `Newtonsoft.Json` 12.0.0.0"), "false hint report: {stderr}");
}

#[test]
fn packages_root_is_found_when_run_from_project_directory() {
    let dir = fixture("solution");
    std::fs::create_dir_all(dir.path().join("packages/Newtonsoft.Json.12.0.1/lib/net45")).unwrap();

    let clean = Command::new(env!("CARGO_BIN_EXE_projref"))
        .args(["clean", "."])
        .current_dir(dir.path().join("App"))
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&clean.stderr);
    assert!(clean.status.success(), "clean failed: {stderr}");

    assert!(stderr.contains("suspicious hint path for `Newtonsoft.Json` 11.0.0.0"), "missing hint report: {stderr}");
    assert!(!stderr.contains("suspicious hint path for `Newtonsoft.Json` 12.0.0.0"), "false hint report: {stderr}");
    assert_eq!(read(dir.path().join("App/App.csproj")), read(PathBuf::from("tests/fixtures/expected/App.csproj")));
}

#[test]
fn check_reports_unclean_until_cleaned() {
    let dir = fixture("solution");

    let before = projref(&["check"], dir.path());
    assert_eq!(before.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&before.stdout);
    assert!(stdout.contains("UNCLEAN App/App.csproj"), "stdout: {stdout}");
    assert!(!stdout.contains("Lib.csproj"), "stdout: {stdout}");
    let untouched = read(dir.path().join("App/App.csproj"));
    assert_eq!(untouched, read(PathBuf::from("tests/fixtures/solution/App/App.csproj")));

    assert!(projref(&["clean"], dir.path()).status.success());

    let after = projref(&["check"], dir.path());
    assert!(after.status.success(), "stdout: {}", String::from_utf8_lossy(&after.stdout));
    assert!(String::from_utf8_lossy(&after.stdout).contains("All 2 projects clean"));
}

#[test]
fn cleaning_twice_is_stable() {
    let dir = fixture("solution");
    assert!(projref(&["clean"], dir.path()).status.success());
    let first = read(dir.path().join("App/App.csproj"));
    assert!(projref(&["clean"], dir.path()).status.success());
    assert_eq!(read(dir.path().join("App/App.csproj")), first);
}

#[test]
fn malformed_reference_skips_only_that_project() {
    let dir = fixture("broken");
    let bad_before = read(dir.path().join("Bad/Bad.csproj"));

    let clean = projref(&["clean"], dir.path());
    assert_eq!(clean.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&clean.stderr);
    assert!(stderr.contains("# Error: Reference Without Identity"), "stderr: {stderr}");

    assert_eq!(read(dir.path().join("Bad/Bad.csproj")), bad_before);
    let good = read(dir.path().join("Good/Good.csproj"));
    let system = good.find("Include=\"System\"").unwrap();
    let xml = good.find("Include=\"System.Xml\"").unwrap();
    assert!(system < xml, "Good.csproj was not reordered:\n{good}");
}

#[test]
fn check_failure_outranks_unclean() {
    let dir = fixture("broken");
    let check = projref(&["check"], dir.path());
    assert_eq!(check.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&check.stdout).contains("1 failed, 1 unclean"));
}

#[test]
fn list_json_reports_declarations() {
    let dir = fixture("solution");
    let output = projref(&["list", "--json"], &dir.path().join("App/App.csproj"));
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["dialect"], "Legacy");
    assert_eq!(listing["target_framework"], "net461");
    assert_eq!(listing["assembly_references"].as_array().unwrap().len(), 5);
    assert_eq!(listing["assembly_references"][0]["name"], "System");
    assert_eq!(listing["assembly_references"][0]["version"], "4.6.1");
    assert_eq!(listing["assembly_references"][1]["is_package_managed"], true);
    assert_eq!(listing["assembly_references"][1]["package_version"], "11.0.2");
    assert_eq!(listing["project_references"][0]["name"], "Lib");
    assert_eq!(listing["package_references"][0]["name"], "Newtonsoft.Json");
    assert_eq!(listing["package_references"][0]["target_framework"], "net461");
}

#[test]
fn list_sdk_project_as_markdown() {
    let dir = fixture("solution");
    let output = projref(&["list"], &dir.path().join("Lib/Lib.csproj"));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(SdkStyle, netstandard2.0)"), "stdout: {stdout}");
    assert!(stdout.contains("- Serilog 2.10.0"), "stdout: {stdout}");
}

#[test]
fn list_missing_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = projref(&["list"], &dir.path().join("Nope.csproj"));
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("# Error: File Not Found"));
}

#[test]
fn add_project_links_sibling_once() {
    let dir = fixture("broken");
    let good = dir.path().join("Good/Good.csproj");
    let bad = dir.path().join("Bad/Bad.csproj");
    let run = || {
        Command::new(env!("CARGO_BIN_EXE_projref"))
            .arg("add-project")
            .arg(&good)
            .arg(&bad)
            .output()
            .unwrap()
    };

    assert!(run().status.success());
    let linked = read(good.clone());
    assert!(linked.contains(r#"<ProjectReference Include="..\Bad\Bad.csproj">"#), "{linked}");
    assert!(linked.contains("<Name>Bad</Name>"), "{linked}");

    let again = run();
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already references"));
    assert_eq!(read(good), linked);
}
