//! Fixed-case verification results.

use serde::{Deserialize, Serialize};

/// Result of verifying a single fixed case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the case.
    pub case_name: String,
    /// Entry point exercised.
    pub entry_point: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Expected rendering (or `<rejected>`).
    pub expected: String,
    /// What the sides actually produced.
    pub actual: String,
    /// Mismatch detail if the case failed.
    pub diff: Option<String>,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Total cases run.
    pub total: usize,
    /// Cases passed.
    pub passed: usize,
    /// Cases failed.
    pub failed: usize,
    /// Individual results.
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            results,
        }
    }

    /// Returns true if all cases passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Render the summary as markdown.
    #[must_use]
    pub fn to_markdown(&self, title: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {title}\n\n"));
        out.push_str(&format!("- Total: {}\n", self.total));
        out.push_str(&format!("- Passed: {}\n", self.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.failed));

        out.push_str("| Case | Entry | Status |\n");
        out.push_str("|------|-------|--------|\n");
        for r in &self.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| `{}` | {} | {} |\n",
                r.case_name.replace('|', "\\|"),
                r.entry_point,
                status
            ));
        }
        for r in self.results.iter().filter(|r| !r.passed) {
            out.push_str(&format!("\n## `{}`\n\n", r.case_name));
            out.push_str(&format!("- expected: `{}`\n", r.expected));
            out.push_str(&format!("- actual: `{}`\n", r.actual));
            if let Some(diff) = &r.diff {
                out.push_str(&format!("\n```\n{diff}\n```\n"));
            }
        }
        out
    }
}
