//! Deconfliction configuration from environment.

use std::env;
use uav_core::{PlannerConfig, ResolutionConfig, RetimePolicy, SafetyRules};

/// Read `UAV_*` variables over the defaults.
pub fn from_env() -> ResolutionConfig {
    from_lookup(|key| env::var(key).ok())
}

/// Build from any key lookup; unset or unparsable values keep defaults.
pub fn from_lookup<F>(lookup: F) -> ResolutionConfig
where
    F: Fn(&str) -> Option<String>,
{
    let rules = SafetyRules::default();
    let planner = PlannerConfig::default();
    let parse_f64 = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

    ResolutionConfig {
        rules: SafetyRules {
            safety_distance: parse_f64("UAV_SAFETY_DISTANCE").unwrap_or(rules.safety_distance),
            time_threshold: parse_f64("UAV_TIME_THRESHOLD").unwrap_or(rules.time_threshold),
        },
        planner: PlannerConfig {
            grid_size: parse_f64("UAV_GRID_SIZE").unwrap_or(planner.grid_size),
            max_expansions: lookup("UAV_MAX_EXPANSIONS")
                .and_then(|s| s.trim().parse().ok())
                .or(planner.max_expansions),
            obstacle_clearance: parse_f64("UAV_OBSTACLE_CLEARANCE")
                .unwrap_or(planner.obstacle_clearance),
            ..planner
        },
        retime: match parse_f64("UAV_RETIME_SPEED") {
            Some(speed) => RetimePolicy::ConstantSpeed { speed },
            None => RetimePolicy::PreserveSpan,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = from_lookup(|_| None);
        assert_eq!(config, ResolutionConfig::default());
    }

    #[test]
    fn test_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("UAV_SAFETY_DISTANCE", "6.5"),
            ("UAV_TIME_THRESHOLD", " 3 "),
            ("UAV_GRID_SIZE", "0.5"),
            ("UAV_MAX_EXPANSIONS", "1000"),
            ("UAV_RETIME_SPEED", "2"),
            ("UAV_OBSTACLE_CLEARANCE", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.rules.safety_distance, 6.5);
        assert_eq!(config.rules.time_threshold, 3.0);
        assert_eq!(config.planner.grid_size, 0.5);
        assert_eq!(config.planner.max_expansions, Some(1000));
        assert_eq!(config.planner.obstacle_clearance, 0.0);
        assert_eq!(config.retime, RetimePolicy::ConstantSpeed { speed: 2.0 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_clearance_fails_validation() {
        let config = from_lookup(|key| {
            (key == "UAV_OBSTACLE_CLEARANCE").then(|| "10000".to_string())
        });
        assert_eq!(config.planner.obstacle_clearance, 10_000.0);
        assert!(config.validate().is_err());
    }
}
