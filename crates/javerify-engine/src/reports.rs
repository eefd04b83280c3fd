//! JUnit XML report aggregation.
//!
//! Surefire, Failsafe and Gradle all emit the same schema: one
//! `<testsuite>` root with counting attributes and `<testcase>` children
//! carrying `<failure>` or `<error>` elements. Counts come from the suite
//! attributes; failed-test details come from the testcases. Reports that
//! do not parse are skipped, never fatal.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use javerify_core::{BuildStack, FailedTest, TestSuiteAggregate};

/// Report directories searched per stack, relative to the project root.
fn report_dirs(stack: BuildStack) -> &'static [&'static str] {
    match stack {
        BuildStack::Maven => &["target/surefire-reports", "target/failsafe-reports"],
        BuildStack::Gradle => &[
            "build/test-results/test",
            "build/test-results/integrationTest",
        ],
        BuildStack::Javac => &[],
    }
}

fn is_report_file(name: &str) -> bool {
    name.starts_with("TEST-") && name.ends_with(".xml")
}

/// Parse and merge every JUnit XML report the stack's build tool left
/// under the project tree.
pub fn aggregate_reports(project_path: &Path, stack: BuildStack) -> TestSuiteAggregate {
    let mut aggregate = TestSuiteAggregate::default();

    for dir in report_dirs(stack) {
        let base = project_path.join(dir);
        if !base.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&base)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(name) = entry.path().file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_report_file(name) {
                continue;
            }

            match parse_report(entry.path()) {
                Some(partial) => aggregate.merge(partial),
                None => warn!(report = name, "skipping unparseable report"),
            }
        }
    }

    debug!(
        total = aggregate.total_tests,
        failed = aggregate.failed_tests,
        reports_found = aggregate.reports_found,
        "report aggregation"
    );
    aggregate
}

fn parse_report(path: &Path) -> Option<TestSuiteAggregate> {
    let raw = std::fs::read_to_string(path).ok()?;
    let doc = roxmltree::Document::parse(&raw).ok()?;

    // Either a bare <testsuite> root or a <testsuites> wrapper.
    let suites: Vec<_> = if doc.root_element().has_tag_name("testsuite") {
        vec![doc.root_element()]
    } else {
        doc.root_element()
            .children()
            .filter(|n| n.has_tag_name("testsuite"))
            .collect()
    };
    if suites.is_empty() {
        return None;
    }

    let mut aggregate = TestSuiteAggregate {
        reports_found: true,
        ..Default::default()
    };

    for suite in suites {
        let tests = attr_u32(&suite, "tests");
        let failures = attr_u32(&suite, "failures");
        let errors = attr_u32(&suite, "errors");
        let skipped = attr_u32(&suite, "skipped");
        let failed = failures + errors;

        aggregate.total_tests += tests;
        aggregate.failed_tests += failed;
        aggregate.skipped_tests += skipped;
        aggregate.passed_tests += tests.saturating_sub(failed + skipped);
        aggregate.execution_time_seconds += suite
            .attribute("time")
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(0.0);

        for case in suite.children().filter(|n| n.has_tag_name("testcase")) {
            let Some(problem) = case
                .children()
                .find(|n| n.has_tag_name("failure") || n.has_tag_name("error"))
            else {
                continue;
            };

            let class = case.attribute("classname").unwrap_or("unknown");
            let name = case.attribute("name").unwrap_or("unknown");
            let message = problem
                .attribute("message")
                .map(str::to_string)
                .or_else(|| problem.text().map(|t| t.trim().to_string()))
                .unwrap_or_default();

            aggregate.failed_test_details.push(FailedTest {
                test_name: format!("{class}.{name}"),
                failure_message: message,
            });
        }
    }

    Some(aggregate)
}

fn attr_u32(node: &roxmltree::Node, attr: &str) -> u32 {
    node.attribute(attr)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
