use ivsweep::analysis::{AnalysisError, AnalysisLevel, DeviceType, SweepAnalyzer};
use proptest::prelude::*;
fn sweep() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (2usize..120).prop_flat_map(|n| {
        (
            prop::collection::vec(-10.0f64..10.0, n),
            prop::collection::vec(-1e-2f64..1e-2, n),
        )
    })
}
proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn finite_input_never_fails((voltage, current) in sweep()) {
        let analyzer = SweepAnalyzer::new(voltage, current, None, None, "research").unwrap();
        let result = analyzer.classification();
        prop_assert!((0.0..=1.0).contains(&result.confidence));
        prop_assert!(matches!(
            result.device_type,
            DeviceType::Memristive
                | DeviceType::Capacitive
                | DeviceType::Conductive
                | DeviceType::Ohmic
                | DeviceType::Uncertain
        ));
        if result.device_type == DeviceType::Uncertain {
            prop_assert_eq!(result.confidence, 0.0);
        }
        let enhanced = analyzer.enhanced_classification();
        prop_assert!(
            (enhanced.memristivity_breakdown.total() - enhanced.memristivity_score).abs() < 1e-6
        );
        prop_assert!((0.0..=100.0 + 1e-9).contains(&enhanced.memristivity_score));
    }
    #[test]
    fn loop_metrics_are_well_formed((voltage, current) in sweep()) {
        let analyzer = SweepAnalyzer::new(voltage, current, None, None, "full").unwrap();
        for m in analyzer.loop_metrics() {
            prop_assert!(m.normalized_area.is_finite());
            if m.ron > 0.0 && m.roff > 0.0 {
                prop_assert!(m.ron <= m.roff);
            }
        }
    }
    #[test]
    fn reports_are_idempotent((voltage, current) in sweep()) {
        let analyzer = SweepAnalyzer::new(voltage, current, None, None, "research").unwrap();
        let first = serde_json::to_string(&analyzer.get_results(AnalysisLevel::Research)).unwrap();
        let second = serde_json::to_string(&analyzer.get_results(AnalysisLevel::Research)).unwrap();
        prop_assert_eq!(first, second);
    }
    #[test]
    fn flat_voltage_has_zero_area(level in -5.0f64..5.0, n in 2usize..60) {
        let analyzer =
            SweepAnalyzer::new(vec![level; n], vec![1e-6; n], None, None, "full").unwrap();
        for m in analyzer.loop_metrics() {
            prop_assert_eq!(m.normalized_area, 0.0);
        }
    }
    #[test]
    fn fewer_than_two_points_is_invalid(v in -10.0f64..10.0, i in -1e-2f64..1e-2) {
        let err = SweepAnalyzer::new(vec![v], vec![i], None, None, "basic").err();
        prop_assert!(matches!(err, Some(AnalysisError::InvalidInput(_))));
    }
}
