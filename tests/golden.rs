//! Golden tests for ctxpack
//!
//! These tests run the binary against the sample project under
//! tests/fixtures and pin down:
//! - Output contract of the packed context (field names, level keys)
//! - Stable ordering across runs
//! - Relationship scores for each supported language

use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;

/// Get the path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Get the path to the sample project
fn sample_project() -> PathBuf {
    fixtures_dir().join("sample_project")
}

/// Create a command for running the ctxpack binary
fn ctxpack_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ctxpack"));
    cmd.env_remove("CTXPACK_MAX_TOKENS")
        .env_remove("CTXPACK_MODEL")
        .env_remove("CTXPACK_ORACLE_CMD")
        .env_remove("CTXPACK_MAX_FILES_PER_LEVEL");
    cmd.arg("--root").arg(sample_project());
    cmd
}

/// Parse JSONL output into a vector of JSON values
fn parse_jsonl(output: &str) -> Vec<Value> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<Value>(l).ok())
        .collect()
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("failed to execute");
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn paths_of(level: &Value) -> Vec<&str> {
    level
        .as_array()
        .expect("level array")
        .iter()
        .filter_map(|e| e.get("path").and_then(|p| p.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: &Value, expected: f64) -> bool {
        value
            .as_f64()
            .map(|v| (v - expected).abs() < 1e-9)
            .unwrap_or(false)
    }

    // ==================== Pack Tests ====================

    #[test]
    fn golden_pack_contract() {
        let context = run_json(ctxpack_cmd().arg("pack"));

        let object = context.as_object().expect("object");
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["file_summaries", "levels", "target_focused_files", "total_files"]
        );
        assert_eq!(context["total_files"], 6);

        for (_, level) in context["levels"].as_object().unwrap() {
            for entry in level.as_array().unwrap() {
                let mut fields: Vec<&str> =
                    entry.as_object().unwrap().keys().map(String::as_str).collect();
                fields.sort();
                assert_eq!(fields, vec!["content", "path", "priority", "type"]);
            }
        }
    }

    #[test]
    fn golden_pack_untargeted_levels() {
        let context = run_json(ctxpack_cmd().arg("pack"));

        assert_eq!(paths_of(&context["levels"]["1"]), vec!["main.go"]);
        assert_eq!(
            paths_of(&context["levels"]["2"]),
            vec![
                "auth/service.py",
                "app/views.py",
                "web/client.ts",
                "app/models.py",
                "tests/test_views.py",
            ]
        );
    }

    #[test]
    fn golden_pack_targeted_levels() {
        let context = run_json(ctxpack_cmd().arg("pack").arg("--targets").arg("auth"));

        let level = paths_of(&context["levels"]["2"]);
        assert_eq!(level[0], "auth/service.py");
        // equal priority, longer first
        assert_eq!(level[1], "app/views.py");
        assert_eq!(level[2], "web/client.ts");
        assert_eq!(
            context["target_focused_files"],
            serde_json::json!(["auth/service.py", "app/views.py", "web/client.ts"])
        );
    }

    #[test]
    fn golden_pack_output_is_deterministic() {
        let first = run_json(ctxpack_cmd().arg("pack").arg("--targets").arg("auth"));
        let second = run_json(ctxpack_cmd().arg("pack").arg("--targets").arg("auth"));
        assert_eq!(first, second);
    }

    #[test]
    fn golden_jsonl_vs_json_equivalence() {
        let json = run_json(ctxpack_cmd().arg("pack"));

        let output = ctxpack_cmd()
            .arg("--format")
            .arg("jsonl")
            .arg("pack")
            .output()
            .expect("failed to execute");
        let lines = parse_jsonl(&String::from_utf8_lossy(&output.stdout));

        let from_json: Vec<(String, &str)> = json["levels"]
            .as_object()
            .unwrap()
            .iter()
            .flat_map(|(depth, level)| {
                paths_of(level)
                    .into_iter()
                    .map(move |p| (depth.clone(), p))
            })
            .collect();
        let from_jsonl: Vec<(String, &str)> = lines
            .iter()
            .map(|l| (l["depth"].to_string(), l["path"].as_str().unwrap()))
            .collect();

        assert_eq!(from_json, from_jsonl);
    }

    #[test]
    fn golden_pattern_filter() {
        let context = run_json(ctxpack_cmd().arg("pack").arg("--patterns").arg("*.go,*.ts"));
        assert_eq!(context["total_files"], 2);
        assert_eq!(paths_of(&context["levels"]["1"]), vec!["main.go"]);
        assert_eq!(paths_of(&context["levels"]["2"]), vec!["web/client.ts"]);
    }

    // ==================== Score Tests ====================

    #[test]
    fn golden_score_python_and_typescript() {
        let report = run_json(ctxpack_cmd().arg("score").arg("--targets").arg("auth"));
        let priorities = &report["priorities"];

        assert_eq!(priorities["auth/service.py"], 1.0);
        // import 0.2, base 0.3, one call 0.1
        assert!(approx(&priorities["app/views.py"], 0.3 * 0.2 + 0.3 * 0.3 + 0.2 * 0.1));
        assert!(approx(&priorities["web/client.ts"], 0.3 * 0.2 + 0.3 * 0.3 + 0.2 * 0.1));
        assert!(priorities.get("app/models.py").is_none());
        assert!(priorities.get("main.go").is_none());
        assert!(priorities.get("tests/test_views.py").is_none());
        assert_eq!(priorities.as_object().unwrap().len(), 3);
    }

    #[test]
    fn golden_score_lists_every_file() {
        let report = run_json(ctxpack_cmd().arg("score").arg("--targets").arg("auth"));
        let scores = report["scores"].as_array().unwrap();
        assert_eq!(scores.len(), 6);

        let direct: Vec<&str> = scores
            .iter()
            .filter(|s| s["direct_match"] == true)
            .filter_map(|s| s["path"].as_str())
            .collect();
        assert_eq!(direct, vec!["auth/service.py"]);
    }

    #[test]
    fn golden_markdown_format_structure() {
        let output = ctxpack_cmd()
            .arg("--format")
            .arg("md")
            .arg("score")
            .arg("--targets")
            .arg("auth")
            .output()
            .expect("failed to execute");
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(stdout.starts_with("| path | priority |"));
        assert!(stdout.contains("| `auth/service.py` (direct) | 1.000 |"));
        assert!(stdout.contains("| `app/views.py` | 0.170 | 0.20 | 0.30 | 0.10 | 0.00 |"));
    }
}
