use std::collections::HashSet;
use std::fs;

use om_core::SimulationRequest;
use om_workspace::{
    RetentionPolicy, SCRIPT_FILE_NAME, ScriptTemplate, WorkspaceError, WorkspaceManager,
    WorkspaceSettings,
};

const DECAY: &str = "model Decay\n  Real x(start=1);\nequation\n  der(x) = -x;\nend Decay;\n";

fn manager(root: &std::path::Path, retention: RetentionPolicy) -> WorkspaceManager {
    WorkspaceManager::new(WorkspaceSettings {
        work_root: root.join("runs"),
        results_root: root.join("results"),
        model_extension: "mo".to_string(),
        template: ScriptTemplate::builtin(),
        retention,
    })
}

#[test]
fn provision_writes_model_and_script() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mgr = manager(tmp.path(), RetentionPolicy::RetainAll);
    let request = SimulationRequest::new(DECAY, "Decay").unwrap();

    let ws = mgr.provision(&request).expect("provision failed");

    assert!(tmp.path().join("results").is_dir());
    assert!(ws.dir.starts_with(tmp.path().join("runs")));
    assert_eq!(ws.model_file, ws.dir.join("Decay.mo"));
    assert_eq!(ws.script_file, ws.dir.join(SCRIPT_FILE_NAME));
    assert_eq!(fs::read_to_string(&ws.model_file).unwrap(), DECAY);

    let script = fs::read_to_string(&ws.script_file).unwrap();
    assert!(!script.contains("{{"));
    assert!(script.contains(&ws.model_file.to_string_lossy().replace('\\', "/")));
    assert!(script.contains("simulate(Decay,"));
    assert!(ws.id.as_str().starts_with("Decay_"));
    assert_eq!(ws.artifact_path(), ws.dir.join("Decay_res.csv"));
}

#[test]
fn back_to_back_runs_get_distinct_directories() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mgr = manager(tmp.path(), RetentionPolicy::RetainAll);
    let request = SimulationRequest::new(DECAY, "Decay").unwrap();

    let mut seen = HashSet::new();
    for _ in 0..20 {
        let ws = mgr.provision(&request).unwrap();
        assert!(seen.insert(ws.dir.clone()), "directory reused: {:?}", ws.dir);
    }
}

#[test]
fn bad_template_fails_before_script_is_written() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template_path = tmp.path().join("custom.mos");
    fs::write(
        &template_path,
        "cd(\"{{workspace_dir}}\");\nloadFile(\"{{model_file}}\");\nsimulate({{model_name}}, method=\"{{solver}}\");\n",
    )
    .unwrap();

    let mgr = WorkspaceManager::new(WorkspaceSettings {
        work_root: tmp.path().join("runs"),
        results_root: tmp.path().join("results"),
        model_extension: "mo".to_string(),
        template: ScriptTemplate::from_file(&template_path).unwrap(),
        retention: RetentionPolicy::RetainAll,
    });
    let request = SimulationRequest::new(DECAY, "Decay").unwrap();

    let err = mgr.provision(&request).unwrap_err();
    assert!(matches!(err, WorkspaceError::PlaceholderError { .. }));
}

#[test]
fn finish_honours_retention_policy() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let request = SimulationRequest::new(DECAY, "Decay").unwrap();

    let keep = manager(tmp.path(), RetentionPolicy::RetainAll);
    let ws = keep.provision(&request).unwrap();
    assert!(!keep.finish(&ws, true).unwrap());
    assert!(ws.dir.exists());

    let prune = manager(tmp.path(), RetentionPolicy::DeleteOnSuccess);
    let failed = prune.provision(&request).unwrap();
    assert!(!prune.finish(&failed, false).unwrap());
    assert!(failed.dir.exists());

    let succeeded = prune.provision(&request).unwrap();
    assert!(prune.finish(&succeeded, true).unwrap());
    assert!(!succeeded.dir.exists());
}
