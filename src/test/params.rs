use crate::error::ConfigError;
use crate::sim::params::{
    self, DEFAULT_PRECISION_FACTOR, PRECISION_FACTOR, REFRESH_TIME, SIM_EVENTS, SIM_TIME,
    TRANSITORY_EVENTS,
};
use crate::sim::{ParamMap, SimParams, SimTime};

fn with(pairs: &[(&str, &str)]) -> ParamMap {
    let mut map = SimParams::default_map();
    for (k, v) in pairs {
        map.insert(k.to_string(), v.to_string());
    }
    map
}

#[test]
fn default_map_parses_to_defaults() {
    let p = SimParams::from_map(&SimParams::default_map()).expect("defaults are valid");
    assert_eq!(p, SimParams::default());
    assert_eq!(p.sim_events, None);
    assert_eq!(p.sim_time, None);
    assert!(!p.disable_statistics);
}

#[test]
fn minus_one_means_unlimited() {
    let p = SimParams::from_map(&with(&[
        (SIM_EVENTS, "5"),
        (TRANSITORY_EVENTS, "-1"),
        (SIM_TIME, "12.5"),
        (params::DISABLE_STATISTICS, "1"),
    ]))
    .expect("valid params");
    assert_eq!(p.sim_events, Some(5));
    assert_eq!(p.transitory_events, None);
    assert_eq!(p.sim_time, Some(SimTime(12.5)));
    assert!(p.disable_statistics);

    let back = SimParams::from_map(&p.to_map()).expect("to_map output is valid");
    assert_eq!(back, p);
}

#[test]
fn missing_key_is_a_config_error() {
    let mut map = SimParams::default_map();
    map.remove(SIM_EVENTS);
    assert_eq!(
        SimParams::from_map(&map),
        Err(ConfigError::MissingParam(SIM_EVENTS.to_string()))
    );
}

#[test]
fn malformed_values_are_rejected() {
    for (key, value) in [
        (SIM_EVENTS, "abc"),
        (SIM_EVENTS, "-2"),
        (SIM_TIME, "-0.5"),
        (REFRESH_TIME, "-3"),
        (params::DISABLE_STATISTICS, "yes"),
    ] {
        match SimParams::from_map(&with(&[(key, value)])) {
            Err(ConfigError::InvalidParam { key: k, value: v, .. }) => {
                assert_eq!(k, key);
                assert_eq!(v, value);
            }
            other => panic!("{key}={value}: expected InvalidParam, got {other:?}"),
        }
    }
}

#[test]
fn refresh_time_accepts_infinity() {
    let p = SimParams::from_map(&with(&[(REFRESH_TIME, "inf")])).expect("inf is allowed");
    assert!(p.refresh_time.is_infinite());
}

#[test]
fn precision_factor_defaults_and_validates() {
    assert_eq!(
        params::precision_factor(&ParamMap::new()),
        Ok(DEFAULT_PRECISION_FACTOR)
    );

    let mut global = ParamMap::new();
    global.insert(PRECISION_FACTOR.to_string(), "0.01".to_string());
    assert_eq!(params::precision_factor(&global), Ok(0.01));

    global.insert(PRECISION_FACTOR.to_string(), "-1".to_string());
    assert!(matches!(
        params::precision_factor(&global),
        Err(ConfigError::InvalidParam { .. })
    ));
}
