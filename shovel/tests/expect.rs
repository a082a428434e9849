use std::io::Write;
use std::process::Command;
use std::time::Duration;

use shovel::expect::{self, Expect};
use shovel::Error;

fn sh(script: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(script);
    command
}

#[test]
fn drives_a_prompt_on_the_controlling_terminal() {
    // The child prompts on /dev/tty (as scrypt does), reads the reply from
    // the terminal, and emits data on stdout.
    let mut session = Expect::spawn(sh(
        r#"printf 'secret word: ' > /dev/tty; read word < /dev/tty; printf 'got %s' "$word""#,
    ))
    .unwrap();

    session
        .expect("secret word: ", Duration::from_secs(5))
        .unwrap();
    session.send(b"sesame\n").unwrap();

    let mut stdout = session.take_stdout().unwrap();
    let mut collected = vec![];
    expect::copy(&mut stdout, &mut collected, Duration::from_secs(5)).unwrap();
    assert_eq!(collected, b"got sesame");

    let (status, _stderr) = session.finish().unwrap();
    assert!(status.success());
}

#[test]
fn copies_stdin_through_to_stdout() {
    let mut session = Expect::spawn(sh("cat")).unwrap();

    let mut stdin = session.take_stdin().unwrap();
    stdin.write_all(b"pass through").unwrap();
    drop(stdin);

    let mut stdout = session.take_stdout().unwrap();
    let mut collected = vec![];
    expect::copy(&mut stdout, &mut collected, Duration::from_secs(5)).unwrap();
    assert_eq!(collected, b"pass through");

    let (status, _stderr) = session.finish().unwrap();
    assert!(status.success());
}

#[test]
fn missing_prompt_times_out() {
    let mut session = Expect::spawn(sh("sleep 5")).unwrap();
    match session.expect("never appears: ", Duration::from_millis(300)) {
        Err(Error::PromptTimeout(phrase)) => assert_eq!(phrase, "never appears: "),
        other => panic!("expected PromptTimeout, got {:?}", other),
    }
    // Dropping the session reaps the still-sleeping child.
}

#[test]
fn eof_before_the_prompt_is_surfaced() {
    let mut session = Expect::spawn(sh("printf 'partial' > /dev/tty")).unwrap();
    match session.expect("full prompt: ", Duration::from_secs(5)) {
        Err(Error::UnexpectedEof(seen)) => assert_eq!(seen, "partial"),
        other => panic!("expected UnexpectedEof, got {:?}", other),
    }
}

#[test]
fn nonzero_exit_is_reported() {
    let session = Expect::spawn(sh("exit 3")).unwrap();
    let (status, _stderr) = session.finish().unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn stderr_is_collected() {
    let session = Expect::spawn(sh("echo oh no >&2; exit 1")).unwrap();
    let (status, stderr) = session.finish().unwrap();
    assert!(!status.success());
    assert_eq!(stderr.trim(), "oh no");
}
