// Drives the compiled binary through a pseudo terminal.
//
// Requires a TTY, so it is Unix-only and ignored by default:
// `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_completes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("keyrace");
    let cmd = format!(
        "env HOME={} XDG_CONFIG_HOME={} {} -p hi --offline",
        home.path().display(),
        home.path().join(".config").display(),
        bin.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("hi")?;
    std::thread::sleep(Duration::from_millis(200));

    // esc quits from the results screen
    p.send("\x1b")?;
    p.expect(Eof)?;
    Ok(())
}
