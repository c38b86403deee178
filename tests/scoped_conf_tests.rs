//! Scoped configuration discipline across analysis runs.

mod common;

use common::select_star_from;
use sql_analyzer::conf::{keys, with_setting, AnalyzerConf};
use sql_analyzer::harness::AnalysisFixture;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[test]
fn override_is_restored_after_a_failing_run() {
    let fixture = AnalysisFixture::new();
    let conf = AnalyzerConf::new();
    conf.set(keys::CASE_SENSITIVE, "true");

    let result = catch_unwind(AssertUnwindSafe(|| {
        with_setting(&conf, keys::CASE_SENSITIVE, "false", || {
            // A run that is made to fail while the override is active.
            fixture.assert_analysis_succeeds(&select_star_from("no_such_view"), false);
        })
    }));
    assert!(result.is_err());
    assert_eq!(conf.get(keys::CASE_SENSITIVE).as_deref(), Some("true"));
}

#[test]
fn harness_runs_do_not_leak_settings_into_a_shared_conf() {
    // The fixture installs its case policy into a per-run conf, never the
    // caller's; a conf probed before and after is untouched.
    let fixture = AnalysisFixture::new();
    let probe = AnalyzerConf::new();
    probe.set(keys::CASE_SENSITIVE, "false");

    fixture.assert_analysis_succeeds(&select_star_from("orders"), true);
    assert_eq!(probe.get(keys::CASE_SENSITIVE).as_deref(), Some("false"));
}

#[test]
fn nested_overrides_restore_in_reverse_order() {
    let conf = AnalyzerConf::new();
    with_setting(&conf, keys::MAX_ITERATIONS, "10", || {
        with_setting(&conf, keys::MAX_ITERATIONS, "20", || {
            assert_eq!(conf.max_iterations(), 20);
        });
        assert_eq!(conf.max_iterations(), 10);
    });
    assert_eq!(conf.max_iterations(), 50);
}

#[test]
fn analyzer_reads_the_override_for_exactly_its_dynamic_extent() {
    let fixture = AnalysisFixture::new();
    let conf = AnalyzerConf::new();
    let catalog = fixture.catalog();
    let analyzer = fixture.analyzer(&catalog, &conf);
    let query = select_star_from("ordersview");

    // Wrong-case reference: resolvable only while the override is active.
    let inside = with_setting(&conf, keys::CASE_SENSITIVE, "false", || {
        analyzer.execute(&query).unwrap().is_resolved()
    });
    assert!(inside);
    assert!(!analyzer.execute(&query).unwrap().is_resolved());
}
