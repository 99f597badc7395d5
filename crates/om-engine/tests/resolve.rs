#![cfg(unix)]

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use om_engine::{EnvironmentResolver, ResolutionSource, ResolverSettings};

/// Lay out `<root>/bin/omc` (+ `lib/`) and return the root.
fn fake_install(parent: &Path, name: &str, executable: bool) -> PathBuf {
    let root = parent.join(name);
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(root.join("lib")).unwrap();
    let omc = root.join("bin").join("omc");
    fs::write(&omc, "#!/bin/sh\necho fake\n").unwrap();
    let mode = if executable { 0o755 } else { 0o644 };
    fs::set_permissions(&omc, fs::Permissions::from_mode(mode)).unwrap();
    root
}

fn settings(
    home: Option<PathBuf>,
    roots: Vec<PathBuf>,
    search_path: Option<OsString>,
) -> ResolverSettings {
    ResolverSettings {
        engine_binary: "omc".to_string(),
        configured_home: home,
        candidate_roots: roots,
        search_path,
    }
}

#[test]
fn configured_home_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let home = fake_install(tmp.path(), "home", true);
    let root = fake_install(tmp.path(), "root", true);

    let env = EnvironmentResolver::new(settings(Some(home.clone()), vec![root], None)).resolve();

    assert!(env.available);
    assert_eq!(env.source, ResolutionSource::ConfiguredHome);
    assert_eq!(env.home.as_deref(), Some(home.as_path()));
    assert_eq!(env.binary, Some(home.join("bin/omc")));
}

#[test]
fn invalid_home_falls_through_to_first_valid_root() {
    let tmp = tempfile::tempdir().unwrap();
    let broken_home = fake_install(tmp.path(), "broken", false);
    let missing = tmp.path().join("missing");
    let first = fake_install(tmp.path(), "first", true);
    let second = fake_install(tmp.path(), "second", true);

    let env = EnvironmentResolver::new(settings(
        Some(broken_home),
        vec![missing, first.clone(), second],
        None,
    ))
    .resolve();

    assert!(env.available);
    assert_eq!(env.source, ResolutionSource::CandidateRoot);
    assert_eq!(env.home.as_deref(), Some(first.as_path()));
}

#[test]
fn search_path_derives_home_from_binary_location() {
    let tmp = tempfile::tempdir().unwrap();
    let install = fake_install(tmp.path(), "onpath", true);
    let search = std::env::join_paths([tmp.path().join("empty"), install.join("bin")]).unwrap();

    let env = EnvironmentResolver::new(settings(None, vec![], Some(search))).resolve();

    assert!(env.available);
    assert_eq!(env.source, ResolutionSource::SearchPath);
    assert_eq!(env.home.as_deref(), Some(install.as_path()));
    assert!(env.status_message.contains("PATH"));
}

#[test]
fn non_executable_binary_is_not_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let install = fake_install(tmp.path(), "noexec", false);
    let search = OsString::from(install.join("bin"));

    let env = EnvironmentResolver::new(settings(None, vec![install], Some(search))).resolve();

    assert!(!env.available);
    assert_eq!(env.source, ResolutionSource::NotFound);
}
