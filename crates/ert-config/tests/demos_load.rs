use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

#[test]
fn demo_configs_validate() {
    let root = workspace_root();
    for rel in ["demos/configs/poly_iterated.yaml", "demos/configs/minimal.yaml"] {
        let path = root.join(rel);
        let result = ert_config::load(&path);
        assert!(
            result.is_ok(),
            "demo config failed validation: {} => {:?}",
            path.display(),
            result.err()
        );
    }
}

#[test]
fn poly_demo_has_expected_iteration_setup() {
    let config = ert_config::load_yaml(&workspace_root().join("demos/configs/poly_iterated.yaml"))
        .unwrap();
    let iteration = &config.analysis.iteration;
    assert_eq!(iteration.num_iterations, 3);
    assert_eq!(iteration.num_retries_per_iteration, 2);
    assert_eq!(iteration.case_name(2), "iter-2");

    let local = config.local_config.unwrap();
    assert_eq!(local.ministeps.len(), 2);
    let range = local.ministeps[1].observations[0].range.unwrap();
    assert_eq!((range.start, range.end), (10, 30));
}
