use ert_config::*;

fn base() -> ErtConfig {
    let mut config = ErtConfig::new(10);
    config.observations = vec![
        ObservationDef {
            key: "WOPR".to_string(),
            steps: vec![10],
        },
        ObservationDef {
            key: "WWCT".to_string(),
            steps: vec![10],
        },
    ];
    config.parameters = vec!["MULTFLT".to_string()];
    config
}

fn ministep(name: &str, obs: &str, param: &str) -> MinistepDef {
    MinistepDef {
        name: name.to_string(),
        observations: vec![ObsSelectionDef {
            key: obs.to_string(),
            range: None,
        }],
        parameters: vec![param.to_string()],
    }
}

#[test]
fn base_config_is_valid() {
    validate_config(&base()).unwrap();
}

#[test]
fn case_format_needs_exactly_one_placeholder() {
    for format in ["NO_PLACEHOLDER", "two_%d_%d"] {
        let mut config = base();
        config.analysis.iteration.case_format = format.to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}

#[test]
fn min_realizations_cannot_exceed_ensemble() {
    let mut config = base();
    config.analysis.min_realizations = 11;
    assert!(validate_config(&config).is_err());

    config.analysis.min_realizations = 10;
    validate_config(&config).unwrap();
}

#[test]
fn iteration_counts_must_be_positive() {
    let mut config = base();
    config.analysis.iteration.num_iterations = 0;
    assert!(validate_config(&config).is_err());

    let mut config = base();
    config.analysis.iteration.num_retries_per_iteration = 0;
    assert!(validate_config(&config).is_err());
}

#[test]
fn duplicate_observation_keys_are_rejected() {
    let mut config = base();
    config.observations.push(ObservationDef {
        key: "WOPR".to_string(),
        steps: vec![20],
    });
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn case_names_cannot_be_paths() {
    let mut config = base();
    config.current_case = "../escape".to_string();
    assert!(validate_config(&config).is_err());

    let mut config = base();
    config.analysis.target_case = Some(String::new());
    assert!(validate_config(&config).is_err());
}

#[test]
fn local_config_references_are_checked() {
    let mut config = base();
    config.local_config = Some(LocalConfigDef {
        ministeps: vec![ministep("A", "FOPR", "MULTFLT")],
    });
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::MissingReference { .. })
    ));

    config.local_config = Some(LocalConfigDef {
        ministeps: vec![ministep("A", "WOPR", "PERMX")],
    });
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::MissingReference { .. })
    ));

    config.local_config = Some(LocalConfigDef {
        ministeps: vec![ministep("A", "WOPR", "MULTFLT"), ministep("A", "WWCT", "MULTFLT")],
    });
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::DuplicateId { .. })
    ));
}

#[test]
fn reversed_range_is_rejected() {
    let mut config = base();
    let mut step = ministep("A", "WOPR", "MULTFLT");
    step.observations[0].range = Some(StepRangeDef { start: 5, end: 1 });
    config.local_config = Some(LocalConfigDef {
        ministeps: vec![step],
    });
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::InvalidValue { .. })
    ));
}
