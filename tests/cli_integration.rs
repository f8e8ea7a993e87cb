//! Integration tests for the EncryptoLock CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  Logins
//! are signed in-process with a throwaway secp256k1 key, and secret
//! values are piped through stdin so no interactive prompt is needed.

use assert_cmd::Command;
use assert_fs::TempDir;
use encryptolock::auth::signature::{address_of, sign_personal_message};
use encryptolock::auth::LOGIN_PHRASE;
use k256::ecdsa::SigningKey;
use predicates::prelude::*;

const MASTER_KEY: &str = "cli-tests-master-key";
const SESSION_SECRET: &str = "cli-tests-session-secret-0123456789abcdef";

/// Helper: get a Command pointing at the encryptolock binary.
fn encryptolock() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("encryptolock").expect("binary should exist")
}

/// A command wired to a database inside `tmp`, with keys set and no
/// ambient token.
fn vault_cmd(tmp: &TempDir) -> Command {
    let mut cmd = encryptolock();
    cmd.env("ENCRYPTOLOCK_MASTER_KEY", MASTER_KEY)
        .env("ENCRYPTOLOCK_SESSION_SECRET", SESSION_SECRET)
        .env_remove("ENCRYPTOLOCK_TOKEN")
        .arg("--project-dir")
        .arg(tmp.path())
        .arg("--db")
        .arg(tmp.path().join("vault.db"));
    cmd
}

fn last_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Log in with a fresh key and return the session token.
fn login(tmp: &TempDir) -> String {
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    let key = SigningKey::from_slice(&bytes).expect("signing key");
    let signature = sign_personal_message(&key, LOGIN_PHRASE).expect("sign");

    let output = vault_cmd(tmp)
        .arg("login")
        .arg("--message")
        .arg(LOGIN_PHRASE)
        .arg("--signature")
        .arg(&signature)
        .arg("--address")
        .arg(address_of(key.verifying_key()))
        .output()
        .expect("run login");
    assert!(output.status.success(), "login failed: {output:?}");

    last_line(&output.stdout)
}

/// Store a secret via stdin and return its id.
fn create(tmp: &TempDir, token: &str, name: &str, value: &str) -> String {
    let output = vault_cmd(tmp)
        .arg("--token")
        .arg(token)
        .arg("create")
        .arg(name)
        .arg("--category")
        .arg("API_KEY")
        .write_stdin(value)
        .output()
        .expect("run create");
    assert!(output.status.success(), "create failed: {output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split(" stored as ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("id in create output")
        .to_string()
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    encryptolock()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted secret vault"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("reveal"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("audit"));
}

#[test]
fn version_flag_shows_version() {
    encryptolock()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("encryptolock"));
}

#[test]
fn no_args_shows_help() {
    encryptolock()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unknown_category_is_rejected_by_the_parser() {
    let tmp = TempDir::new().unwrap();
    vault_cmd(&tmp)
        .args(["create", "x", "--category", "CERT"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// Environment and session errors
// ---------------------------------------------------------------------------

#[test]
fn missing_master_key_fails() {
    let tmp = TempDir::new().unwrap();
    encryptolock()
        .env_remove("ENCRYPTOLOCK_MASTER_KEY")
        .env("ENCRYPTOLOCK_SESSION_SECRET", SESSION_SECRET)
        .arg("--project-dir")
        .arg(tmp.path())
        .args(["list", "--token", "whatever"])
        .assert()
        .failure();
}

#[test]
fn commands_without_token_fail() {
    let tmp = TempDir::new().unwrap();
    vault_cmd(&tmp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn garbage_token_fails() {
    let tmp = TempDir::new().unwrap();
    vault_cmd(&tmp)
        .args(["--token", "not-a-token", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn login_with_wrong_address_fails() {
    let tmp = TempDir::new().unwrap();
    let key = SigningKey::from_slice(&[7u8; 32]).expect("signing key");
    let signature = sign_personal_message(&key, LOGIN_PHRASE).expect("sign");

    vault_cmd(&tmp)
        .arg("login")
        .arg("--message")
        .arg(LOGIN_PHRASE)
        .arg("--signature")
        .arg(&signature)
        .arg("--address")
        .arg("0x0000000000000000000000000000000000000001")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match"));
}

// ---------------------------------------------------------------------------
// Full flow
// ---------------------------------------------------------------------------

#[test]
fn login_create_list_reveal_delete() {
    let tmp = TempDir::new().unwrap();
    let token = login(&tmp);
    assert!(!token.is_empty());

    let id = create(&tmp, &token, "github", "s3cr3t");

    vault_cmd(&tmp)
        .env("ENCRYPTOLOCK_TOKEN", &token)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("github"))
        .stdout(predicate::str::contains("API_KEY"))
        .stdout(predicate::str::contains("s3cr3t").not());

    vault_cmd(&tmp)
        .env("ENCRYPTOLOCK_TOKEN", &token)
        .args(["reveal", &id])
        .assert()
        .success()
        .stdout(predicate::str::diff("s3cr3t\n"));

    vault_cmd(&tmp)
        .env("ENCRYPTOLOCK_TOKEN", &token)
        .args(["search", "git"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()));

    vault_cmd(&tmp)
        .env("ENCRYPTOLOCK_TOKEN", &token)
        .args(["delete", &id, "--force"])
        .assert()
        .success();

    vault_cmd(&tmp)
        .env("ENCRYPTOLOCK_TOKEN", &token)
        .args(["reveal", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Secret not found"));
}

#[test]
fn another_owner_cannot_reveal() {
    let tmp = TempDir::new().unwrap();
    let alice = login(&tmp);
    let bob = login(&tmp);

    let id = create(&tmp, &alice, "alice-only", "private");

    vault_cmd(&tmp)
        .args(["--token", &bob, "reveal", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Secret not found"));
}

#[test]
fn audit_shows_recorded_actions() {
    let tmp = TempDir::new().unwrap();
    let token = login(&tmp);
    create(&tmp, &token, "github", "s3cr3t");

    vault_cmd(&tmp)
        .args(["--token", &token, "audit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE_SECRET"))
        .stdout(predicate::str::contains("LOGIN"));
}

#[test]
fn challenge_prints_a_signable_message() {
    let tmp = TempDir::new().unwrap();
    vault_cmd(&tmp)
        .args(["challenge", "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(LOGIN_PHRASE))
        .stdout(predicate::str::contains("Nonce:"));
}

#[test]
fn purge_audit_reports_removed_count() {
    let tmp = TempDir::new().unwrap();
    login(&tmp);

    vault_cmd(&tmp)
        .arg("purge-audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 audit entries"));
}
