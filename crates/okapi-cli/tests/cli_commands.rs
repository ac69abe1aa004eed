//! Integration tests for the `okapi` binary.

#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SHOP: &str = r#"# start
[Bob]: Want a coin?
* Yes -> yes
* No -> no

# yes
{OneShot}
[Bob]: Here you go.

=>{
  gold = gold + 1;
  print("coin given");
}

# no
[Bob]: Suit yourself.

{gold > 10}=>rich

# rich
[Bob]: You don't need it anyway.
"#;

/// Write a script into a fresh temp directory.
fn script(name: &str, source: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    (dir, path)
}

fn okapi() -> Command {
    Command::cargo_bin("okapi").unwrap()
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_passes_valid_script() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("4 dialogues").and(predicate::str::contains("All checks passed")));
}

#[test]
fn check_reports_warnings_but_passes() {
    let (_dir, path) = script("warn.dlg", "# a\n[Bob]: Hi\n* missing arrow\n");
    okapi()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("option is missing").and(predicate::str::contains("1 warning")));
}

#[test]
fn check_fails_on_dropped_statement() {
    let (_dir, path) = script("bad.dlg", "# a\n=>{\n  broken\n}\n");
    okapi()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("must end with ';'"));
}

#[test]
fn check_fails_on_duplicate_key() {
    let (_dir, path) = script("dup.dlg", "# a\n[Bob]: one\n\n# a\n[Bob]: two\n");
    okapi()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate dialogue key"));
}

#[test]
fn check_fails_on_text_outside_dialogue() {
    let (_dir, path) = script("orphan.dlg", "Hello there\n# a\n");
    okapi()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside of any dialogue"));
}

#[test]
fn check_missing_file() {
    okapi()
        .args(["check", "/nonexistent/script.dlg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn check_with_speaker_file() {
    let (dir, path) = script("s.dlg", "# a\n[Robert]: Hi\n\n[Eve]: psst\n");
    let speakers = dir.path().join("speakers.toml");
    fs::write(&speakers, "[[speaker]]\nname = \"Bob\"\naliases = [\"Robert\"]\n").unwrap();

    okapi()
        .arg("check")
        .arg(&path)
        .arg("--speakers")
        .arg(&speakers)
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown speaker \"Eve\""));
}

// ---------------------------------------------------------------------------
// keys
// ---------------------------------------------------------------------------

#[test]
fn keys_lists_dialogues() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("keys")
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("start")
                .and(predicate::str::contains("OneShot"))
                .and(predicate::str::contains("{gold > 10} rich"))
                .and(predicate::str::contains("4 dialogues")),
        );
}

#[test]
fn keys_empty_script() {
    let (_dir, path) = script("empty.dlg", "// nothing here\n");
    okapi()
        .arg("keys")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No dialogues found"));
}

// ---------------------------------------------------------------------------
// dump
// ---------------------------------------------------------------------------

#[test]
fn dump_normalises_script() {
    let (_dir, path) = script("n.dlg", "#  a  \n[Bob]:   Hi /* note */\n{random}\n=>  b\n");
    okapi()
        .arg("dump")
        .arg(&path)
        .assert()
        .success()
        .stdout("# a\n{Random}\n[Bob]: Hi\n\n=>b\n");
}

#[test]
fn dump_json() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .args(["dump", "--json"])
        .arg(&path)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"name\": \"start\"")
                .and(predicate::str::contains("\"Attribution\"")),
        );
}

// ---------------------------------------------------------------------------
// play
// ---------------------------------------------------------------------------

#[test]
fn play_option_and_code_block() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("play")
        .arg(&path)
        .args(["start", "--set", "gold=5"])
        .write_stdin("1\n\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Want a coin?")
                .and(predicate::str::contains("Here you go."))
                .and(predicate::str::contains("coin given"))
                .and(predicate::str::contains("gold = 6")),
        );
}

#[test]
fn play_conditional_exit() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("play")
        .arg(&path)
        .args(["start", "--set", "gold=20"])
        .write_stdin("2\n\n\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Suit yourself.")
                .and(predicate::str::contains("You don't need it anyway.")),
        );
}

#[test]
fn play_rejects_invalid_choice() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("play")
        .arg(&path)
        .arg("start")
        .write_stdin("7\n2\n\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("please enter a number between 1 and 2")
                .and(predicate::str::contains("Suit yourself.")),
        );
}

#[test]
fn play_unknown_key_fails() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("play")
        .arg(&path)
        .arg("missing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no dialogue \"missing\""));
}

#[test]
fn play_rejects_bad_assignment() {
    let (_dir, path) = script("shop.dlg", SHOP);
    okapi()
        .arg("play")
        .arg(&path)
        .args(["start", "--set", "gold"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=VALUE"));
}

#[test]
fn play_builtin_start_command() {
    let (_dir, path) = script(
        "jump.dlg",
        "# a\n[Bob]: First\n\n=>{ start(\"b\"); }\n\n# b\n[Alice]: Second\n",
    );
    okapi()
        .arg("play")
        .arg(&path)
        .arg("a")
        .write_stdin("\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("First").and(predicate::str::contains("Second")));
}

#[test]
fn play_random_with_seed_is_reproducible() {
    let (_dir, path) = script("r.dlg", "# r\n{Random}\n[A]: one\n\n[A]: two\n\n[A]: three\n");
    let run = || {
        okapi()
            .arg("play")
            .arg(&path)
            .args(["r", "--seed", "11"])
            .write_stdin("\n")
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}
