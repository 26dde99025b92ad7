//! Framework de testes do kernel
//!
//! Suites são tabelas estáticas de `TestCase`. No kernel elas rodam via
//! `run_test_suite` (feature `self_test`); no host cada caso também é
//! executado pelo harness do `cargo test`.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

impl TestResult {
    /// Converte uma condição em resultado.
    #[inline]
    pub fn check(ok: bool) -> Self {
        if ok {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Contagem final de uma suite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuiteReport {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn merge(&mut self, other: SuiteReport) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Executa suite de testes
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> SuiteReport {
    crate::klog!("=== Executando suite: ");
    crate::klog!(name);
    crate::knl!();

    let mut report = SuiteReport::default();

    for test in tests {
        match (test.func)() {
            TestResult::Passed => {
                crate::kok!(test.name);
                report.passed += 1;
            }
            TestResult::Failed => {
                crate::kfail!(test.name);
                report.failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!(test.name);
                report.skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", report.passed);
    if report.failed > 0 {
        crate::kerror!("Resultados: failed=", report.failed);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok() -> TestResult {
        TestResult::Passed
    }

    fn bad() -> TestResult {
        TestResult::Failed
    }

    fn skip() -> TestResult {
        TestResult::Skipped
    }

    #[test]
    fn suite_counts_each_outcome() {
        let suite = [
            TestCase::new("ok", ok),
            TestCase::new("bad", bad),
            TestCase::new("skip", skip),
            TestCase::new("ok2", ok),
        ];
        let report = run_test_suite("contagem", &suite);
        assert_eq!(
            report,
            SuiteReport {
                passed: 2,
                failed: 1,
                skipped: 1
            }
        );
        assert!(!report.all_passed());
    }
}
