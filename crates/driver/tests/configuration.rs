mod common;

use braid_driver::{Driver, DriverConfig, EngineKind, Error, OptionValue, Sensitivity};

use common::{Scripted, Step, quadratic};

#[test]
fn toml_config_drives_engine_selection_and_options() {
    let config: DriverConfig = toml::from_str(
        r#"
        optimizer = "ipopt"
        title = "quadratic"
        print_results = false
        engine_finite_difference = true

        [options]
        max_iter = 25
        tol = 1e-10
        "#,
    )
    .expect("config should parse");

    let (engine, transcript) = Scripted::new(vec![Step::Evaluate(0.5)], 0.5);
    let mut driver = Driver::new(config).with_engine(EngineKind::Ipopt, engine);

    let summary = driver.run_unobserved(&mut quadratic()).unwrap();
    assert_eq!(summary.iterations, 1);

    let transcript = transcript.borrow();
    let options = transcript.options.as_ref().unwrap();
    assert_eq!(options.get("max_iter"), Some(&OptionValue::Int(25)));
    assert_eq!(options.get("tol").and_then(OptionValue::as_f64), Some(1e-10));
    assert!(matches!(
        transcript.sensitivity,
        Some(Sensitivity::FiniteDifference { .. })
    ));
    assert_eq!(transcript.spec.as_ref().unwrap().title, "quadratic");
}

#[test]
fn unknown_option_names_the_engine_and_key() {
    let config: DriverConfig = toml::from_str(
        r#"
        optimizer = "SLSQP"

        [options]
        MAXITER = 10
        "#,
    )
    .unwrap();

    let (engine, _) = Scripted::new(vec![], 0.0);
    let mut driver = Driver::new(config).with_engine(EngineKind::Slsqp, engine);

    let err = driver.run_unobserved(&mut quadratic()).unwrap_err();

    assert_eq!(err.to_string(), "SLSQP does not recognize option `MAXITER`");
    assert!(matches!(err, Error::UnknownOption { engine: EngineKind::Slsqp, .. }));
}

#[test]
fn every_engine_has_a_distinct_name() {
    for kind in EngineKind::ALL {
        let parsed: EngineKind = kind.name().to_lowercase().parse().unwrap();
        assert_eq!(parsed, kind);
    }
}
