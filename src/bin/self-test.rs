/*!
 * MTGJSON utility self-test
 *
 * Exercises the offline utilities against known values and writes a JSON
 * report. Network collaborators are only checked for configuration:
 * - url_keygen / to_camel_case / rules slicing / Windows names
 * - deterministic sorting of nested data
 * - bounded parallel calls with folding
 * - file hashing of this executable
 * - Pushover notifier skipped without credentials
 */

#![warn(clippy::all, clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::fs;
use std::time::{Instant, SystemTime};

use mtgjson_util::{
    fix_windows_set_name, parallel_call, parse_magic_rules_subset, sort_internal_lists, to_camel_case,
    url_keygen, Config, FileHasher, Fold, HashAlgorithm, ParallelOptions, DEFAULT_BAD_FILE_NAMES,
};

/* ANSI Color codes for terminal output */
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const BLUE: &str = "\x1b[34m";
    pub const YELLOW: &str = "\x1b[33m";
}

#[derive(Debug, serde::Serialize)]
struct CheckResult {
    name: String,
    passed: bool,
    skipped: bool,
    #[serde(rename = "durationMs")]
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct Report<'a> {
    #[serde(rename = "crate")]
    crate_name: &'a str,
    version: &'a str,
    timestamp: String,
    checks: &'a [CheckResult],
}

struct Logger;

impl Logger {
    fn message(msg: &str, color: &str) {
        println!("{}{}{}", color, msg, colors::RESET);
    }

    fn check(result: &CheckResult) {
        let (status, color) = match (result.skipped, result.passed) {
            (true, _) => ("⏭  SKIP", colors::YELLOW),
            (false, true) => ("✅ PASS", colors::GREEN),
            (false, false) => ("❌ FAIL", colors::RED),
        };
        println!("  {}{}: {}{}", color, status, result.name, colors::RESET);
        if let Some(detail) = &result.detail {
            if !result.passed || result.skipped {
                println!("    {}{}{}", color, detail, colors::RESET);
            }
        }
    }
}

struct SelfTestRunner {
    config: Config,
    checks: Vec<CheckResult>,
}

impl SelfTestRunner {
    fn new() -> Result<Self> {
        let config = Config::from_env().context("Failed to load configuration")?;
        Ok(Self {
            config,
            checks: Vec::new(),
        })
    }

    fn timestamp() -> String {
        let datetime: DateTime<Utc> = SystemTime::now().into();
        datetime.format("%Y-%m-%dT%H:%M:%S.%3fZ").to_string()
    }

    fn record(&mut self, name: &str, started: Instant, outcome: Result<()>) {
        let result = CheckResult {
            name: name.to_string(),
            passed: outcome.is_ok(),
            skipped: false,
            duration_ms: started.elapsed().as_millis(),
            detail: outcome.err().map(|e| format!("{e:#}")),
        };
        Logger::check(&result);
        self.checks.push(result);
    }

    fn skip(&mut self, name: &str, reason: &str) {
        let result = CheckResult {
            name: name.to_string(),
            passed: true,
            skipped: true,
            duration_ms: 0,
            detail: Some(reason.to_string()),
        };
        Logger::check(&result);
        self.checks.push(result);
    }

    async fn run_all(&mut self) -> Result<bool> {
        Logger::message("═══════════════════════════════════════════", colors::BLUE);
        Logger::message(&format!("    MTGJSON utility self-test v{}", mtgjson_util::VERSION), colors::BLUE);
        Logger::message("═══════════════════════════════════════════", colors::BLUE);

        Logger::message("\n1. Strings", colors::BLUE);
        let started = Instant::now();
        self.record("url_keygen / to_camel_case", started, check_strings());
        let started = Instant::now();
        self.record("rules subset / windows names", started, check_rules_and_names());

        Logger::message("\n2. Sorting", colors::BLUE);
        let started = Instant::now();
        self.record("sort_internal_lists", started, check_sort());

        Logger::message("\n3. Parallel calls", colors::BLUE);
        let started = Instant::now();
        let outcome = check_parallel().await;
        self.record("parallel_call fold list / dict", started, outcome);

        Logger::message("\n4. Hashing", colors::BLUE);
        let started = Instant::now();
        let outcome = check_hashing(self.config.hashing);
        self.record("hash current executable", started, outcome);

        Logger::message("\n5. Notifications", colors::BLUE);
        if self.config.pushover.app_token.is_empty() || self.config.pushover.recipients().next().is_none() {
            self.skip("pushover", "no Pushover credentials configured");
        } else {
            let started = Instant::now();
            let notifier = self.config.notifier()?;
            let delivered = notifier.send("MTGJSON utility self-test").await;
            let outcome = if delivered {
                Ok(())
            } else {
                Err(anyhow::anyhow!("notification was not delivered to every user"))
            };
            self.record("pushover", started, outcome);
        }

        self.save_report()?;
        Ok(self.display_summary())
    }

    fn save_report(&self) -> Result<()> {
        let results_dir = std::env::var("MTGJSON5_SELF_TEST_RESULTS")
            .unwrap_or_else(|_| "self-test-results".to_string());
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("Failed to create results directory: {results_dir}"))?;

        let report = Report {
            crate_name: env!("CARGO_PKG_NAME"),
            version: mtgjson_util::VERSION,
            timestamp: Self::timestamp(),
            checks: &self.checks,
        };

        let results_path = format!("{results_dir}/rust-results.json");
        let output = serde_json::to_string_pretty(&report).context("Failed to serialize results")?;
        fs::write(&results_path, output)
            .with_context(|| format!("Cannot create results file: {results_path}"))?;

        println!("\n{}📁 Results saved to: {}{}", colors::BLUE, results_path, colors::RESET);
        Ok(())
    }

    fn display_summary(&self) -> bool {
        Logger::message("\n═══════════════════════════════════════════", colors::BLUE);
        Logger::message("            TEST SUMMARY REPORT", colors::BLUE);
        Logger::message("═══════════════════════════════════════════", colors::BLUE);

        let total = self.checks.len();
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let skipped = self.checks.iter().filter(|c| c.skipped).count();

        let color = if passed == total { colors::GREEN } else { colors::RED };
        println!("{}Checks Passed: {}/{} ({} skipped){}", color, passed, total, skipped, colors::RESET);

        for failed in self.checks.iter().filter(|c| !c.passed) {
            println!("  - {}: {}", failed.name, failed.detail.as_deref().unwrap_or("failed"));
        }

        Logger::message("═══════════════════════════════════════════", colors::BLUE);
        passed == total
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(anyhow::anyhow!(message()))
    }
}

fn check_strings() -> Result<()> {
    let key = url_keygen("tcgplayer12345", true);
    ensure(key.len() == "https://mtgjson.com/links/".len() + 16, || format!("unexpected key {key}"))?;
    ensure(url_keygen(42, false) == url_keygen("42", false), || "seed string form differs".to_string())?;

    let camel = to_camel_case("is_online_only");
    ensure(camel == "isOnlineOnly", || format!("got {camel}"))
}

fn check_rules_and_names() -> Result<()> {
    let rules = "Glossary\r\nContents\r\nGlossary\r\nAbility\r\nCredits\r\n";
    let glossary = parse_magic_rules_subset(rules, "Glossary", "Credits")?;
    ensure(glossary == "\nAbility", || format!("got {glossary:?}"))?;

    let fixed = fix_windows_set_name("CON", DEFAULT_BAD_FILE_NAMES);
    ensure(fixed == "CON_", || format!("got {fixed}"))
}

fn check_sort() -> Result<()> {
    let sorted = sort_internal_lists(json!({
        "colors": ["W", "U", "B"],
        "legalities": {"formats": ["vintage", "legacy"]},
        "number": 7,
    }))?;

    let expected = json!({
        "colors": ["B", "U", "W"],
        "legalities": {"formats": ["legacy", "vintage"]},
        "number": 7,
    });
    ensure(sorted == expected, || format!("got {sorted}"))
}

async fn check_parallel() -> Result<()> {
    let flat = parallel_call(
        |n: u64| async move { Ok(json!([n, n * 10])) },
        vec![1, 2, 3],
        ParallelOptions::new().with_pool_size(2).with_fold(Fold::List),
    )
    .await?;
    ensure(flat == json!([1, 10, 2, 20, 3, 30]), || format!("got {flat}"))?;

    let merged = parallel_call(
        |(key, value): (&'static str, u64)| async move { Ok(json!({ key: value })) },
        vec![("a", 1), ("b", 2), ("a", 3)],
        ParallelOptions::new().with_fold(Fold::Dict),
    )
    .await?;
    ensure(merged == json!({"a": 3, "b": 2}), || format!("got {merged}"))
}

fn check_hashing(hasher: FileHasher) -> Result<()> {
    let exe = std::env::current_exe().context("Cannot locate current executable")?;
    let digest = hasher.hash_file(&exe)?;
    ensure(digest.len() == hasher.algorithm.hex_len(), || format!("unexpected digest {digest}"))?;

    let sha256 = FileHasher::new(HashAlgorithm::Sha256).hash_bytes(b"");
    ensure(
        sha256 == "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        || format!("empty input digest {sha256}"),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut runner = SelfTestRunner::new().context("Failed to initialize test runner")?;

    let all_passed = runner.run_all().await.context("Test execution failed")?;
    if !all_passed {
        std::process::exit(1);
    }

    Ok(())
}
