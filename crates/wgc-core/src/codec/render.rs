//! Canonical text rendering

use super::{INTERFACE_MARKER, PEER_MARKER};
use crate::peer::Peer;
use crate::tunnel::TunnelConfig;

/// Render the full configuration
///
/// Interface keys come in a fixed order (`Address`, `ListenPort`,
/// `PrivateKey`, `MTU`, `DNS`), followed by the lifecycle hooks and one
/// block per peer. Sections are separated by a blank line.
pub fn render(config: &TunnelConfig) -> String {
    let mut interface = vec![
        INTERFACE_MARKER.to_string(),
        format!("Address = {}", config.addresses().join(",")),
        format!("ListenPort = {}", config.listen_port()),
        format!("PrivateKey = {}", config.private_key()),
    ];
    if let Some(mtu) = config.mtu() {
        interface.push(format!("MTU = {}", mtu));
    }
    if let Some(dns) = config.dns() {
        interface.push(format!("DNS = {}", dns));
    }

    let mut sections = vec![interface.join("\n")];

    let hooks: Vec<String> = [
        ("PreUp", config.pre_up()),
        ("PostUp", config.post_up()),
        ("PreDown", config.pre_down()),
        ("PostDown", config.post_down()),
    ]
    .into_iter()
    .filter(|(_, commands)| !commands.is_empty())
    .map(|(key, commands)| format!("{} = {}", key, commands.join(",")))
    .collect();

    if !hooks.is_empty() {
        sections.push(hooks.join("\n"));
    }

    sections.extend(config.peers().iter().map(render_peer));

    finish(sections)
}

/// Render one peer block
pub fn render_peer(peer: &Peer) -> String {
    let mut lines = vec![
        PEER_MARKER.to_string(),
        format!("PublicKey = {}", peer.public_key()),
        format!("AllowedIPs = {}", peer.allowed_ips().join(",")),
    ];
    if let Some(keepalive) = peer.persistent_keepalive() {
        lines.push(format!("PersistentKeepalive = {}", keepalive));
    }
    if let Some(endpoint) = peer.endpoint() {
        lines.push(format!("Endpoint = {}", endpoint));
    }
    lines.join("\n")
}

/// Everything a client-side document needs
#[derive(Debug, Clone)]
pub struct ClientDocument<'a> {
    pub private_key: &'a str,
    pub addresses: &'a [String],
    pub dns: Option<&'a str>,
    pub server_public_key: &'a str,
    pub allowed_ips: &'a [String],
    pub persistent_keepalive: Option<u32>,
    pub endpoint: &'a str,
}

/// Render a self-contained client configuration
pub fn render_client(doc: &ClientDocument<'_>) -> String {
    let mut interface = vec![
        INTERFACE_MARKER.to_string(),
        format!("PrivateKey = {}", doc.private_key),
        format!("Address = {}", doc.addresses.join(",")),
    ];
    if let Some(dns) = doc.dns {
        interface.push(format!("DNS = {}", dns));
    }

    let mut server = vec![
        PEER_MARKER.to_string(),
        format!("PublicKey = {}", doc.server_public_key),
        format!("AllowedIPs = {}", doc.allowed_ips.join(",")),
    ];
    if let Some(keepalive) = doc.persistent_keepalive {
        server.push(format!("PersistentKeepalive = {}", keepalive));
    }
    server.push(format!("Endpoint = {}", doc.endpoint));

    finish(vec![interface.join("\n"), server.join("\n")])
}

fn finish(sections: Vec<String>) -> String {
    let mut text = sections.join("\n\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyFactory;
    use crate::peer::PeerParams;
    use crate::tunnel::TunnelParams;

    const SERVER_KEY: &str = "yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=";

    #[test]
    fn test_minimal_interface() {
        let config =
            TunnelConfig::new(TunnelParams::new("10.10.1.0/24", 51820, SERVER_KEY)).unwrap();

        assert_eq!(
            render(&config),
            format!(
                "[Interface]\nAddress = 10.10.1.0/24\nListenPort = 51820\nPrivateKey = {}\n",
                SERVER_KEY
            )
        );
    }

    #[test]
    fn test_full_layout() {
        let params = TunnelParams::new("10.10.1.0/24", 51820, SERVER_KEY)
            .with_address("10.20.0.0/16")
            .with_mtu(1420)
            .with_dns("1.1.1.1")
            .with_post_up("iptables -A FORWARD -i wg0 -j ACCEPT")
            .with_post_down("iptables -D FORWARD -i wg0 -j ACCEPT")
            .with_peer(
                PeerParams::new()
                    .with_public_key("peer-one=")
                    .with_allowed_ip("10.10.1.2/32")
                    .with_keepalive(25)
                    .with_endpoint("198.51.100.7:51820"),
            )
            .with_peer(
                PeerParams::new()
                    .with_public_key("peer-two=")
                    .with_allowed_ip("10.10.1.3/32"),
            );

        let config = TunnelConfig::new(params).unwrap();
        let expected = format!(
            "[Interface]
Address = 10.10.1.0/24,10.20.0.0/16
ListenPort = 51820
PrivateKey = {}
MTU = 1420
DNS = 1.1.1.1

PostUp = iptables -A FORWARD -i wg0 -j ACCEPT
PostDown = iptables -D FORWARD -i wg0 -j ACCEPT

[Peer]
PublicKey = peer-one=
AllowedIPs = 10.10.1.2/32
PersistentKeepalive = 25
Endpoint = 198.51.100.7:51820

[Peer]
PublicKey = peer-two=
AllowedIPs = 10.10.1.3/32
",
            SERVER_KEY
        );

        assert_eq!(render(&config), expected);
    }

    #[test]
    fn test_peer_block_defaults() {
        let keys = KeyFactory::default();
        let peer = Peer::from_params(PeerParams::new().with_public_key("abc="), &keys).unwrap();
        assert_eq!(
            render_peer(&peer),
            "[Peer]\nPublicKey = abc=\nAllowedIPs = 0.0.0.0/0,::/0"
        );
    }

    #[test]
    fn test_client_document() {
        let addresses = vec!["10.10.1.2/32".to_string()];
        let allowed = vec!["10.10.1.0/24".to_string()];
        let text = render_client(&ClientDocument {
            private_key: "client-private=",
            addresses: &addresses,
            dns: Some("1.1.1.1"),
            server_public_key: "server-public=",
            allowed_ips: &allowed,
            persistent_keepalive: None,
            endpoint: "vpn.example.com:51820",
        });

        assert_eq!(
            text,
            "[Interface]
PrivateKey = client-private=
Address = 10.10.1.2/32
DNS = 1.1.1.1

[Peer]
PublicKey = server-public=
AllowedIPs = 10.10.1.0/24
Endpoint = vpn.example.com:51820
"
        );
    }
}
