mod common;

use common::{fake_signature, rsa_blob, MockAgent, MockKey};
use shovel::agent::{Agent, FingerprintHash, SSH_AGENT_RSA_SHA2_512};
use shovel::Error;

#[test]
fn lists_identities_with_metadata() {
    let mock = MockAgent::spawn(vec![
        MockKey::new("alice@example", 1),
        MockKey {
            blob: rsa_blob(2),
            comment: "bob@example".to_owned(),
            refuse_sign: false,
        },
    ]);
    let mut agent = Agent::connect(&mock.path, FingerprintHash::Sha256).unwrap();

    let identities = agent.list_identities().unwrap();
    assert_eq!(identities.len(), 2);

    assert_eq!(identities[0].comment, "alice@example");
    assert_eq!(identities[0].algorithm, "ssh-ed25519");
    assert_eq!(
        identities[0].fingerprint,
        FingerprintHash::Sha256.fingerprint(&identities[0].blob),
    );
    assert!(identities[0].fingerprint.starts_with("SHA256:"));

    assert_eq!(identities[1].algorithm, "ssh-rsa");
}

#[test]
fn md5_fingerprints_when_asked() {
    let mock = MockAgent::spawn(vec![MockKey::new("alice@example", 1)]);
    let mut agent = Agent::connect(&mock.path, FingerprintHash::Md5).unwrap();

    let identities = agent.list_identities().unwrap();
    assert!(identities[0].fingerprint.starts_with("MD5:"));
    // 16 colon-separated hex pairs.
    assert_eq!(identities[0].fingerprint.matches(':').count(), 16);
}

#[test]
fn signatures_are_deterministic() {
    let mock = MockAgent::spawn(vec![MockKey::new("alice@example", 1)]);
    let mut agent = Agent::connect(&mock.path, FingerprintHash::Sha256).unwrap();
    let identity = agent.list_identities().unwrap().remove(0);

    let first = agent
        .sign(&identity.blob, b"a nonce", SSH_AGENT_RSA_SHA2_512)
        .unwrap()
        .expect("agent signs");
    let second = agent
        .sign(&identity.blob, b"a nonce", SSH_AGENT_RSA_SHA2_512)
        .unwrap()
        .expect("agent signs");

    assert_eq!(first, second);
    assert_eq!(first, fake_signature(&identity.blob, b"a nonce"));
}

#[test]
fn refusal_is_not_an_error() {
    let mock = MockAgent::spawn(vec![MockKey::refusing("locked@example", 3)]);
    let mut agent = Agent::connect(&mock.path, FingerprintHash::Sha256).unwrap();
    let identity = agent.list_identities().unwrap().remove(0);

    assert!(agent.sign(&identity.blob, b"a nonce", 0).unwrap().is_none());
}

#[test]
fn unexpected_message_type_is_a_protocol_violation() {
    let (path, _dir) = common::spawn_rogue();
    let mut agent = Agent::connect(&path, FingerprintHash::Sha256).unwrap();

    match agent.list_identities() {
        Err(Error::Protocol(_)) => (),
        other => panic!("expected a protocol violation, got {:?}", other.map(|v| v.len())),
    }
}

#[test]
fn missing_socket_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-agent-here.sock");
    match Agent::connect(&path, FingerprintHash::Sha256) {
        Err(Error::AgentUnreachable(_)) => (),
        _ => panic!("expected AgentUnreachable"),
    }
}
