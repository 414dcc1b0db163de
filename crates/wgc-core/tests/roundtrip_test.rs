//! Render/Parse Round-Trip Test
//!
//! Verifies that rendering a parsed rendering reproduces the original text.

use wgc_core::{KeyFactory, KeyPair, PeerParams, TunnelConfig, TunnelParams};

fn assert_fixed_point(config: &TunnelConfig) {
    let text = config.render();
    let parsed = TunnelConfig::parse(&text).expect("Rendered config should parse");
    assert_eq!(parsed.render(), text, "render(parse(render(cfg))) should equal render(cfg)");
    assert_eq!(parsed.fingerprint(), config.fingerprint());
}

#[test]
fn test_minimal_config_round_trip() {
    let keys = KeyFactory::default();
    let server = KeyPair::generate(&keys).unwrap();
    let params = TunnelParams::new("10.10.1.0/24", 51820, server.private_key().unwrap());
    let config = TunnelConfig::new(params).unwrap();

    assert_fixed_point(&config);
}

#[test]
fn test_full_config_round_trip() {
    let keys = KeyFactory::default();
    let server = KeyPair::generate(&keys).unwrap();
    let params = TunnelParams::new("10.10.1.0/24", 51999, server.private_key().unwrap())
        .with_address("fd00:10::1/64")
        .with_dns("1.1.1.1")
        .with_mtu(1420)
        .with_pre_up("sysctl -w net.ipv4.ip_forward=1")
        .with_post_up("iptables -A FORWARD -i %i -j ACCEPT")
        .with_post_up("iptables -t nat -A POSTROUTING -o eth0 -j MASQUERADE")
        .with_pre_down("logger wg down")
        .with_post_down("iptables -D FORWARD -i %i -j ACCEPT");

    let mut config = TunnelConfig::new(params).unwrap();
    config.add_peer(PeerParams::new()).unwrap();
    config
        .add_peer(
            PeerParams::new()
                .with_keepalive(25)
                .with_endpoint("198.51.100.20:51820"),
        )
        .unwrap();
    config
        .add_peer(
            PeerParams::new()
                .with_allowed_ip("10.10.1.200/32")
                .with_allowed_ip("10.50.0.0/16"),
        )
        .unwrap();

    assert_fixed_point(&config);
}

#[test]
fn test_parsed_values_match() {
    let keys = KeyFactory::default();
    let server = KeyPair::generate(&keys).unwrap();
    let mut config = TunnelConfig::new(
        TunnelParams::new("10.10.1.0/24", 51820, server.private_key().unwrap())
            .with_dns("9.9.9.9")
            .with_mtu(1380),
    )
    .unwrap();
    let added = config
        .add_peer(PeerParams::new().with_keepalive(15).with_endpoint("peer.example.net:51820"))
        .unwrap()
        .clone();

    let parsed = TunnelConfig::parse(&config.render()).unwrap();

    assert_eq!(parsed.addresses(), config.addresses());
    assert_eq!(parsed.listen_port(), 51820);
    assert_eq!(parsed.public_key(), config.public_key());
    assert_eq!(parsed.dns(), Some("9.9.9.9"));
    assert_eq!(parsed.mtu(), Some(1380));

    let peer = parsed.peer(added.public_key()).expect("Peer should survive the round trip");
    assert_eq!(peer.allowed_ips(), added.allowed_ips());
    assert_eq!(peer.persistent_keepalive(), Some(15));
    assert_eq!(peer.endpoint(), Some("peer.example.net:51820"));
    // Server-side text carries only the peer's public key
    assert!(peer.key_pair().private_key().is_none());
}

#[test]
fn test_values_match_with_secrets_restored() {
    let keys = KeyFactory::default();
    let server = KeyPair::generate(&keys).unwrap();
    let params = TunnelParams::new("10.10.1.0/24", 51820, server.private_key().unwrap());
    let mut config = TunnelConfig::new(params).unwrap();
    config.add_peer(PeerParams::new().with_keepalive(25)).unwrap();
    config.add_peer(PeerParams::new().with_public_key("remote=")).unwrap();

    let mut parsed = TunnelConfig::parse(&config.render()).unwrap();
    parsed.apply_secrets(&config.peer_secrets()).unwrap();

    assert_eq!(parsed, config);
}

#[test]
fn test_lenient_input_normalises() {
    let keys = KeyFactory::default();
    let server = KeyPair::generate(&keys).unwrap();
    let messy = format!(
        "# hand edited
[Interface]
address = 10.0.0.1/24
Address = 10.1.0.1/24
PrivateKey = {}
Table = off

[Peer]
PublicKey = remote=
AllowedIPs = 10.0.0.2/32 , 10.0.0.3/32
PersistentKeepalive = 0
",
        server.private_key().unwrap()
    );

    let config = TunnelConfig::parse(&messy).unwrap();
    let canonical = config.render();

    assert!(canonical.contains("Address = 10.0.0.1/24,10.1.0.1/24\n"));
    assert!(canonical.contains("AllowedIPs = 10.0.0.2/32,10.0.0.3/32\n"));
    assert!(!canonical.contains("PersistentKeepalive"));
    assert!(!canonical.contains("Table"));
    assert_eq!(TunnelConfig::parse(&canonical).unwrap().render(), canonical);
}
