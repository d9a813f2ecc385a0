use figment::{
    providers::{Format, Toml},
    Figment,
};

use mzhardklor::search::SearchAlgorithm;
use mzhardklor::{HardklorEngine, HardklorParams};
use mzhardklor_cli::open_peak_list;

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured_search() {
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("./tests/data/search.toml"));
    let params: HardklorParams = config.extract().unwrap();
    assert_eq!(params.charge_range, (1, 3));
    assert_eq!(params.algorithm, SearchAlgorithm::SemiComplete);
    assert_eq!(params.model_library.bucket_count, 300);
    assert_eq!(params.max_candidates, HardklorParams::default().max_candidates);

    let engine = HardklorEngine::new(params).unwrap();
    assert_eq!(engine.library().variants().len(), 2);

    let peaks = open_peak_list("./tests/data/window.txt").unwrap();
    assert_eq!(peaks.len(), 7);
    let result = engine.analyze_window(&peaks).unwrap();
    assert!(result.candidates > 0);
    assert!(!result.is_empty());
    assert!(result.score() > 0.0);
    assert!(result.hypotheses.len() <= 2);
}
