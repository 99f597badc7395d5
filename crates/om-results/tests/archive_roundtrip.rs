use std::fs;
use std::path::Path;

use om_core::{ModelIdentifier, SimulationRequest, SimulationSetup};
use om_engine::ProcessOutcome;
use om_results::{ArchiveStore, Extraction, ResultsError, extract};
use om_workspace::{RetentionPolicy, ScriptTemplate, Workspace, WorkspaceManager, WorkspaceSettings};

const CSV: &str = "\"time\",\"x\",\"der(x)\",\n0,1,-1,\n5,0.0067,-0.0067,\n10,0.0000454,-0.0000454,\n";

fn provision(root: &Path, model: &str) -> Workspace {
    let mgr = WorkspaceManager::new(WorkspaceSettings {
        work_root: root.join("runs"),
        results_root: root.join("results"),
        model_extension: "mo".to_string(),
        template: ScriptTemplate::builtin(),
        retention: RetentionPolicy::RetainAll,
    });
    let source = format!("model {0}\nend {0};\n", model);
    mgr.provision(&SimulationRequest::new(source, model).unwrap())
        .unwrap()
}

fn outcome(stdout: &str) -> ProcessOutcome {
    ProcessOutcome {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        ..Default::default()
    }
}

#[test]
fn missing_artifact_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = provision(tmp.path(), "Decay");
    assert_eq!(extract(&outcome(""), &ws).unwrap(), Extraction::NotFound);
}

#[test]
fn unreadable_artifact_is_file_processing_error() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = provision(tmp.path(), "Decay");
    fs::write(ws.artifact_path(), "time,x\n0,1\n1,not-a-number\n").unwrap();

    let err = extract(&outcome(""), &ws).unwrap_err();
    match err {
        ResultsError::FileProcessing { path, reason } => {
            assert_eq!(path, ws.artifact_path());
            assert!(reason.contains("not-a-number"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn archive_list_load_roundtrip() {
    let tmp = tempfile::tempdir().unwrap();
    let ws = provision(tmp.path(), "Decay");
    fs::write(ws.artifact_path(), CSV).unwrap();

    let Extraction::Found {
        artifact,
        performance,
    } = extract(&outcome("    timeSimulation = 0.01,\n    timeTotal = 0.9\n"), &ws).unwrap()
    else {
        panic!("artifact should be found");
    };
    assert_eq!(performance.unwrap().total_time_s, Some(0.9));

    let store = ArchiveStore::new(tmp.path().join("results")).unwrap();
    let archived = store
        .archive(&ws, &artifact, &SimulationSetup::default(), performance)
        .unwrap();

    assert_eq!(
        archived.artifact_path,
        tmp.path().join("results").join(ws.id.as_str()).join("Decay_res.csv")
    );
    assert_eq!(fs::read_to_string(&archived.artifact_path).unwrap(), CSV);
    assert!(store.has_run(ws.id.as_str()));

    let manifest = store.load_manifest(ws.id.as_str()).unwrap();
    assert_eq!(manifest.sample_count, 3);
    assert_eq!(manifest.variables, vec!["x".to_string(), "der(x)".to_string()]);
    assert_eq!(manifest.artifact_sha256, om_results::artifact_digest(CSV.as_bytes()));

    let reloaded = store.load_artifact(ws.id.as_str()).unwrap();
    assert_eq!(reloaded, artifact);
}

#[test]
fn same_model_runs_do_not_overwrite_each_other() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path().join("results")).unwrap();

    let mut ids = Vec::new();
    for value in ["1", "2"] {
        let ws = provision(tmp.path(), "Decay");
        fs::write(ws.artifact_path(), format!("time,x\n0,{}\n", value)).unwrap();
        let Extraction::Found { artifact, .. } = extract(&outcome(""), &ws).unwrap() else {
            panic!("artifact should be found");
        };
        store
            .archive(&ws, &artifact, &SimulationSetup::default(), None)
            .unwrap();
        ids.push(ws.id);
    }

    assert_ne!(ids[0], ids[1]);
    assert_eq!(store.load_artifact(ids[0].as_str()).unwrap().series("x").unwrap(), [1.0]);
    assert_eq!(store.load_artifact(ids[1].as_str()).unwrap().series("x").unwrap(), [2.0]);
}

#[test]
fn list_runs_filters_by_model() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path().join("results")).unwrap();

    for model in ["Decay", "Decay", "Tank"] {
        let ws = provision(tmp.path(), model);
        fs::write(ws.artifact_path(), "time,h\n0,1\n").unwrap();
        let Extraction::Found { artifact, .. } = extract(&outcome(""), &ws).unwrap() else {
            panic!("artifact should be found");
        };
        store
            .archive(&ws, &artifact, &SimulationSetup::default(), None)
            .unwrap();
    }
    // Incomplete run directory without a manifest.
    fs::create_dir_all(tmp.path().join("results").join("Stray_1_deadbeef")).unwrap();

    let decay = ModelIdentifier::new("Decay").unwrap();
    assert_eq!(store.list_runs(Some(&decay)).unwrap().len(), 2);
    assert_eq!(store.list_runs(None).unwrap().len(), 3);

    let first = store.list_runs(None).unwrap().remove(0);
    store.delete_run(first.run_id.as_str()).unwrap();
    assert_eq!(store.list_runs(None).unwrap().len(), 2);
}

#[test]
fn unknown_or_malformed_run_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let store = ArchiveStore::new(tmp.path().join("results")).unwrap();

    assert!(matches!(
        store.load_manifest("Nope_1_00000000"),
        Err(ResultsError::RunNotFound { .. })
    ));
    assert!(matches!(
        store.load_manifest("../escape"),
        Err(ResultsError::InvalidRunId(_))
    ));
    assert!(!store.has_run("../escape"));
}
