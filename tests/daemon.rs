//! End-to-end tests: configuration file, SQLite database and session.

use std::{
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::{Duration, Instant},
};

use rusqlite::Connection;
use socketmap_sql::{
    Config, MiscConfig, TransformRegistry,
    protocol::{Closed, ProtocolTransport, Session, netstring},
    storage::SqliteLookup,
    transform::TransformError,
};
use tempdir::TempDir;

fn setup(dir: &Path, misc: &str) -> PathBuf {
    let db = dir.join("virtual.db");
    Connection::open(&db)
        .unwrap()
        .execute_batch(
            "CREATE TABLE aliases (source TEXT, target TEXT);
             INSERT INTO aliases VALUES ('postmaster@example.com', 'root@example.com');
             CREATE TABLE domains (name TEXT);
             INSERT INTO domains VALUES ('example.com');
             CREATE TABLE mailboxes (user TEXT, domain TEXT, maildir TEXT);
             INSERT INTO mailboxes VALUES ('jane', 'example.com', 'example.com/jane/');",
        )
        .unwrap();

    let config = format!(
        r#"
[database]
database = "{}"
read_only = true

[misc]
{misc}

[tables.aliases]
query = "SELECT target FROM aliases WHERE source = ?"
transform = "lowercase"

[tables.domains]
query = "SELECT 'yes' FROM domains WHERE name = ?"
transform = "domain"

[tables.mailboxes]
query = "SELECT maildir FROM mailboxes WHERE user = ? AND domain = ?"
transform = "split"

[tables.reversed]
query = "SELECT target FROM aliases WHERE source = ?"
transform = "reverse"
"#,
        db.display()
    );

    let path = dir.join("socketmap-sql.toml");
    fs::write(&path, config).unwrap();
    path
}

fn registry() -> TransformRegistry {
    let mut registry = TransformRegistry::with_builtins();
    registry.register(
        "reverse",
        |arg: &str, _: &MiscConfig| -> Result<Vec<String>, TransformError> {
            Ok(vec![arg.chars().rev().collect()])
        },
    );
    registry
}

fn frames(requests: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for request in requests {
        netstring::write_netstring(&mut out, request.as_bytes()).unwrap();
    }
    out
}

fn replies(output: &[u8]) -> Vec<String> {
    let mut cursor = Cursor::new(output);
    let mut replies = Vec::new();
    while let Some(frame) = netstring::read_netstring(&mut cursor).unwrap() {
        replies.push(String::from_utf8(frame).unwrap());
    }
    replies
}

#[test]
fn session_against_configured_database() {
    let temp = TempDir::new("daemon").unwrap();
    let path = setup(temp.path(), "recipient_delimiter = \"+\"");
    let config = Config::from_file(&path, &registry()).unwrap();

    let input = frames(&[
        "aliases PostMaster@Example.com",
        "domains someone@EXAMPLE.COM",
        "mailboxes Jane+Lists@example.com",
        "reversed moc.elpmaxe@retsamtsop",
        "aliases nobody@example.com",
        "unknown x",
        "aliases never@answered",
    ]);
    let mut transport = ProtocolTransport::new(Cursor::new(input), Vec::new()).unwrap();

    let closed = Session::new(
        &config.tables,
        &config.misc,
        SqliteLookup::open(&config.database).unwrap(),
        Duration::from_secs(30),
    )
    .with_max_requests(config.misc.max_requests().unwrap())
    .serve(&mut transport)
    .unwrap();

    assert_eq!(closed, Closed::Failed);
    assert_eq!(
        replies(&transport.into_output()),
        vec![
            "OK root@example.com",
            "OK yes",
            "OK example.com/jane/",
            "OK root@example.com",
            "NOTFOUND ",
            "PERM no such table: unknown",
        ]
    );
}

#[test]
fn session_honours_configured_budget() {
    let temp = TempDir::new("daemon").unwrap();
    let path = setup(temp.path(), "max_requests = 2");
    let config = Config::from_file(&path, &registry()).unwrap();

    let input = frames(&[
        "domains a@example.com",
        "domains b@example.org",
        "domains c@example.com",
    ]);
    let mut transport = ProtocolTransport::new(Cursor::new(input), Vec::new()).unwrap();

    let closed = Session::new(
        &config.tables,
        &config.misc,
        SqliteLookup::open(&config.database).unwrap(),
        Duration::from_secs(30),
    )
    .with_max_requests(config.misc.max_requests().unwrap())
    .serve(&mut transport)
    .unwrap();

    assert_eq!(closed, Closed::BudgetExhausted);
    assert_eq!(
        replies(&transport.into_output()),
        vec!["OK yes", "NOTFOUND "]
    );
}

#[test]
fn daemon_binary_serves_stdio() {
    let temp = TempDir::new("daemon").unwrap();
    // The binary only knows the built-in transforms.
    let path = setup(temp.path(), "");
    let config = fs::read_to_string(&path).unwrap();
    let trimmed = config.split("[tables.reversed]").next().unwrap();
    fs::write(&path, trimmed).unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_socketmap-sql"))
        .arg("--config")
        .arg(&path)
        .arg("--timeout")
        .arg("1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(&frames(&["domains x@example.com", "domains x@example.net"]))
        .unwrap();
    stdin.flush().unwrap();

    // Keep stdin open: the daemon must leave on its own once idle.
    let started = Instant::now();
    let output = child.wait_with_output().unwrap();
    drop(stdin);

    assert!(output.status.success());
    assert!(started.elapsed() < Duration::from_secs(20));
    assert_eq!(replies(&output.stdout), vec!["OK yes", "NOTFOUND "]);
}

#[test]
fn daemon_binary_rejects_bad_config() {
    let temp = TempDir::new("daemon").unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(
        &path,
        "[database]\ndatabase = \":memory:\"\n[tables.t]\nquery = \"SELECT 1\"\ntransform = \"nope\"\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_socketmap-sql"))
        .arg("--config")
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
