// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the loggraph CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const COMMITS: &str = "\
a1,, alice, Mon Jan 01 10:00:00 2020 +0000
a2,a1, bob, Mon Jan 01 11:00:00 2020 +0000
";

const EMAILS: &str = "\
ann@example.org,ben@example.org,2014-03-07 16:30:00,lunch?
ben@example.org,ann@example.org,\"Fri, 07 Mar 2014 16:45:00 +0000\",\"Re: lunch?\"
ann@example.org,cat@example.org,2014-03-08T09:00:00Z,minutes
";

/// Build a command with colors off
fn loggraph() -> Command {
    let mut cmd = Command::cargo_bin("loggraph").expect("binary is built");
    cmd.arg("--no-color");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_commits_to_graphml() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "commits.txt", COMMITS);
    let output = dir.path().join("commits.graphml");

    loggraph()
        .args(["commits", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of nodes: 4"))
        .stdout(predicate::str::contains("Number of edges: 3"))
        .stdout(predicate::str::contains("Wrote GraphML"));

    let xml = read(&output);
    assert!(xml.contains("<node id=\"alice\">"));
    assert!(xml.contains(">3600.0</data>"));
}

#[test]
fn test_commits_reports_bad_rows_and_continues() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "commits.txt",
        "a1,,alice,Mon Jan 01 10:00:00 2020 +0000\na2,a1,bob,someday\na3,a1,carol,Mon Jan 01 12:00:00 2020 +0000\n",
    );
    let output = dir.path().join("out.graphml");

    loggraph()
        .args(["commits", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped 1 malformed row(s)"))
        .stderr(predicate::str::contains("someday"));

    assert!(!read(&output).contains("bob"));
}

#[test]
fn test_commits_json_format() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "commits.txt", COMMITS);
    let output = dir.path().join("commits.json");

    loggraph()
        .args(["commits", "--format", "json", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_str(&read(&output)).unwrap();
    assert_eq!(value["links"].as_array().unwrap().len(), 3);
}

#[test]
fn test_commits_defaults_from_config() {
    let dir = TempDir::new().unwrap();
    write(&dir, "log.txt", COMMITS);
    let config = write(
        &dir,
        "loggraph.toml",
        &format!(
            "data_dir = {:?}\ncommit_log = \"log.txt\"\ncommit_graph = \"graph.graphml\"\ngraph_name = \"Configured\"\n",
            dir.path().display().to_string()
        ),
    );

    loggraph()
        .arg("--config")
        .arg(&config)
        .arg("commits")
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: Configured"));

    assert!(dir.path().join("graph.graphml").exists());
}

#[test]
fn test_commits_header_row() {
    let dir = TempDir::new().unwrap();
    let input = write(
        &dir,
        "commits.csv",
        &format!("hash,parents,author,date\n{COMMITS}"),
    );
    let output = dir.path().join("out.graphml");

    loggraph()
        .args(["commits", "--headers", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipped").not());
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    loggraph()
        .args(["commits", "--input"])
        .arg(dir.path().join("absent.txt"))
        .arg("--output")
        .arg(dir.path().join("out.graphml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_emails_multigraph() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "emails.csv", EMAILS);
    let output = dir.path().join("emails.graphml");

    loggraph()
        .args(["emails", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Type: MultiGraph"))
        .stdout(predicate::str::contains("Number of nodes: 3"))
        .stdout(predicate::str::contains("Number of edges: 3"));

    let xml = read(&output);
    assert!(xml.contains(">2014-03-07T16:45:00+0000</data>"));
    assert!(xml.contains(">Re: lunch?</data>"));
}

#[test]
fn test_config_prints_defaults() {
    loggraph()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit_log = \"sklearncommits.txt\""));

    loggraph()
        .args(["config", "data_dir"])
        .assert()
        .success()
        .stdout("data\n");
}

#[test]
fn test_completions() {
    loggraph()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("loggraph"));
}
