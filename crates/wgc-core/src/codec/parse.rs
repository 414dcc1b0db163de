//! Lenient configuration parser
//!
//! A two-state machine fed one line at a time, so any line source works.
//! Unknown keys, comments and malformed values are skipped; only a missing
//! `PrivateKey` or `Address` fails the parse. Peer blocks naming no key
//! are dropped, so parsing never invents a peer identity.

use tracing::{debug, warn};

use super::{split_list, PEER_MARKER};
use crate::error::{Result, WgError};
use crate::keys::KeyFactory;
use crate::peer::PeerParams;
use crate::tunnel::{TunnelConfig, TunnelParams, DEFAULT_LISTEN_PORT};

/// Parse configuration text into a tunnel config
pub fn parse(text: &str, keys: KeyFactory) -> Result<TunnelConfig> {
    TunnelConfig::with_keys(parse_lines(text.lines())?, keys)
}

/// Parse any sequence of lines into construction parameters
pub fn parse_lines<I, S>(lines: I) -> Result<TunnelParams>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = ConfigParser::new();
    for line in lines {
        parser.feed_line(line.as_ref());
    }
    parser.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Peer,
}

#[derive(Debug, Default)]
struct HeaderRecord {
    private_key: Option<String>,
    public_key: Option<String>,
    addresses: Vec<String>,
    listen_port: Option<u16>,
    dns: Option<String>,
    mtu: Option<u32>,
    pre_up: Vec<String>,
    post_up: Vec<String>,
    pre_down: Vec<String>,
    post_down: Vec<String>,
}

/// Incremental parser state
#[derive(Debug)]
pub struct ConfigParser {
    section: Section,
    header: HeaderRecord,
    peers: Vec<PeerParams>,
    line_no: usize,
}

impl ConfigParser {
    /// Start in the interface header
    pub fn new() -> Self {
        Self {
            section: Section::Header,
            header: HeaderRecord::default(),
            peers: Vec::new(),
            line_no: 0,
        }
    }

    /// Consume one line
    pub fn feed_line(&mut self, raw: &str) {
        self.line_no += 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            return;
        }

        // Must be checked before key=value splitting
        if line.eq_ignore_ascii_case(PEER_MARKER) {
            self.peers.push(PeerParams::new());
            self.section = Section::Peer;
            return;
        }

        if line.starts_with('[') {
            debug!("Line {}: ignoring section marker {}", self.line_no, line);
            return;
        }

        let Some((key, value)) = line.split_once('=') else {
            debug!("Line {}: not a key/value pair, skipped", self.line_no);
            return;
        };

        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match self.section {
            Section::Header => self.header_entry(&key, value),
            Section::Peer => self.peer_entry(&key, value),
        }
    }

    /// Assemble the collected fields
    pub fn finish(self) -> Result<TunnelParams> {
        let header = self.header;

        let private_key = header.private_key.ok_or(WgError::MissingField("PrivateKey"))?;
        if header.addresses.is_empty() {
            return Err(WgError::MissingField("Address"));
        }

        let listen_port = header.listen_port.unwrap_or_else(|| {
            warn!("No ListenPort in config, using {}", DEFAULT_LISTEN_PORT);
            DEFAULT_LISTEN_PORT
        });

        let peers = self
            .peers
            .into_iter()
            .filter(|peer| {
                let keyed = peer.public_key.is_some() || peer.private_key.is_some();
                if !keyed {
                    debug!("Dropping peer block without a key ({:?})", peer.allowed_ips);
                }
                keyed
            })
            .collect();

        Ok(TunnelParams {
            addresses: header.addresses,
            listen_port,
            private_key,
            public_key: header.public_key,
            dns: header.dns,
            mtu: header.mtu,
            pre_up: header.pre_up,
            post_up: header.post_up,
            pre_down: header.pre_down,
            post_down: header.post_down,
            peers,
        })
    }

    fn header_entry(&mut self, key: &str, value: &str) {
        let line_no = self.line_no;
        let header = &mut self.header;
        match key {
            "privatekey" => header.private_key = non_empty(value),
            "publickey" => header.public_key = non_empty(value),
            "address" => header.addresses.extend(split_list(value)),
            "listenport" => header.listen_port = number(line_no, key, value),
            "dns" => header.dns = non_empty(value),
            "mtu" => header.mtu = number(line_no, key, value),
            "preup" => header.pre_up.extend(split_list(value)),
            "postup" => header.post_up.extend(split_list(value)),
            "predown" => header.pre_down.extend(split_list(value)),
            "postdown" => header.post_down.extend(split_list(value)),
            _ => debug!("Line {}: unknown interface key {}", line_no, key),
        }
    }

    fn peer_entry(&mut self, key: &str, value: &str) {
        let line_no = self.line_no;
        let Some(peer) = self.peers.last_mut() else {
            return;
        };

        match key {
            "publickey" => peer.public_key = non_empty(value),
            "privatekey" => peer.private_key = non_empty(value),
            "presharedkey" => peer.preshared_key = non_empty(value),
            "allowedips" => peer.allowed_ips.extend(split_list(value)),
            "persistentkeepalive" => peer.persistent_keepalive = number(line_no, key, value),
            "endpoint" => peer.endpoint = non_empty(value),
            _ => debug!("Line {}: unknown peer key {}", line_no, key),
        }
    }
}

impl Default for ConfigParser {
    fn default() -> Self {
        Self::new()
    }
}

fn number<T: std::str::FromStr>(line_no: usize, key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!("Line {}: {} value {:?} is not a number, skipped", line_no, key, value);
            None
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}
