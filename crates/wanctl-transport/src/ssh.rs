//! SSH command transport.
//!
//! Mirrors the REST transport's shape against a single multiplexed SSH
//! session: known-hosts validation happens once at connect time (a host-key
//! mismatch is terminal), then each operation execs one newline-terminated
//! line-oriented command and parses `key=value` output line-by-line. Auth
//! is passwordless, public-key only.

use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Mutex;

use ssh2::{CheckResult, KnownHostFileKind, Session};
use wanctl_common::config::RouterConfig;

use crate::cake::CakeStats;
use crate::error::TransportError;
use crate::router::{Direction, RouterTransport};

pub struct SshTransport {
    host: String,
    port: u16,
    user: String,
    key_path: PathBuf,
    session: Mutex<Option<Session>>,
}

impl SshTransport {
    pub fn new(config: &RouterConfig) -> Self {
        SshTransport {
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone().unwrap_or_else(|| "wanctl".to_string()),
            key_path: config
                .ssh_key
                .clone()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/etc/wanctl/ssh_key")),
            session: Mutex::new(None),
        }
    }

    /// Connect, validate the host key against the system known_hosts file,
    /// and authenticate with the configured private key. Called lazily on
    /// first use and again after any connection loss.
    fn connect(&self) -> Result<Session, TransportError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| TransportError::Retryable(format!("tcp connect {}:{}: {e}", self.host, self.port)))?;
        let mut session = Session::new()
            .map_err(|e| TransportError::Terminal(format!("failed to create ssh session: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| TransportError::Retryable(format!("ssh handshake with {}: {e}", self.host)))?;

        self.verify_host_key(&session)?;

        session
            .userauth_pubkey_file(&self.user, None, &self.key_path, None)
            .map_err(|e| {
                TransportError::Terminal(format!(
                    "key-based auth for {} failed: {e}",
                    self.user
                ))
            })?;
        if !session.authenticated() {
            return Err(TransportError::Terminal(format!(
                "ssh session to {} did not authenticate",
                self.host
            )));
        }
        Ok(session)
    }

    fn verify_host_key(&self, session: &Session) -> Result<(), TransportError> {
        let (key, _key_type) = session
            .host_key()
            .ok_or_else(|| TransportError::Terminal("router offered no host key".to_string()))?;

        let mut known_hosts = session
            .known_hosts()
            .map_err(|e| TransportError::Terminal(format!("failed to load known_hosts: {e}")))?;
        let known_hosts_path = dirs_known_hosts_path();
        let _ = known_hosts.read_file(&known_hosts_path, KnownHostFileKind::OpenSSH);

        match known_hosts.check(&self.host, key) {
            CheckResult::Match => Ok(()),
            CheckResult::NotFound => {
                // First contact: trust on first use, but persist so future
                // mismatches are caught.
                let _ = known_hosts.add(&self.host, key, "wanctl-managed-router", KnownHostFileKind::OpenSSH);
                let _ = known_hosts.write_file(&known_hosts_path, KnownHostFileKind::OpenSSH);
                Ok(())
            }
            CheckResult::Mismatch => Err(TransportError::Terminal(format!(
                "host key for {} does not match known_hosts — possible MITM, refusing to connect",
                self.host
            ))),
            CheckResult::Failure => Err(TransportError::Terminal(
                "known_hosts check failed".to_string(),
            )),
        }
    }

    /// Run one SSH session with at most one outstanding command at a time.
    fn with_session<T>(
        &self,
        f: impl FnOnce(&Session) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let mut guard = self.session.lock().unwrap();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let session = guard.as_ref().unwrap();
        match f(session) {
            Ok(v) => Ok(v),
            Err(e) if e.is_retryable() => {
                // Connection likely died; drop it so the next call reconnects.
                *guard = None;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn exec_line(session: &Session, command: &str) -> Result<String, TransportError> {
        let mut channel = session
            .channel_session()
            .map_err(|e| TransportError::Retryable(format!("ssh channel open failed: {e}")))?;
        channel
            .exec(command)
            .map_err(|e| TransportError::Retryable(format!("ssh exec '{command}' failed: {e}")))?;
        let mut output = String::new();
        channel
            .read_to_string(&mut output)
            .map_err(|e| TransportError::Retryable(format!("ssh read failed: {e}")))?;
        channel
            .wait_close()
            .map_err(|e| TransportError::Retryable(format!("ssh channel close failed: {e}")))?;
        let status = channel
            .exit_status()
            .map_err(|e| TransportError::Retryable(format!("ssh exit status read failed: {e}")))?;
        if status != 0 {
            return Err(TransportError::Terminal(format!(
                "command '{command}' exited {status}: {}",
                output.trim()
            )));
        }
        Ok(output)
    }
}

/// Parse `key=value` pairs from router output, parsed line-by-line.
fn parse_kv_lines(output: &str) -> std::collections::HashMap<String, String> {
    let mut map = std::collections::HashMap::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    map
}

fn parse_u64(map: &std::collections::HashMap<String, String>, key: &str) -> u64 {
    map.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
}

impl RouterTransport for SshTransport {
    fn read_stats(&self, queue_name: &str) -> Result<CakeStats, TransportError> {
        let command = format!("queue print detail {queue_name}");
        let output = self.with_session(|session| Self::exec_line(session, &command))?;
        let fields = parse_kv_lines(&output);
        Ok(CakeStats {
            dropped_pkts: parse_u64(&fields, "dropped"),
            queued_pkts: parse_u64(&fields, "queued"),
            bytes_in: parse_u64(&fields, "bytes"),
            rtt_hint: fields.get("rtt_hint").and_then(|v| v.parse().ok()),
        })
    }

    fn set_rate(
        &self,
        queue_name: &str,
        direction: Direction,
        mbps: f64,
    ) -> Result<(), TransportError> {
        // The router's queue object carries both directions in one
        // max-limit field; re-read the current value for the direction we
        // are not touching so we don't clobber it.
        let current = self.read_current_rates(queue_name)?;
        let (up, down) = match direction {
            Direction::Upload => (mbps, current.1),
            Direction::Download => (current.0, mbps),
        };
        let command =
            format!("queue set [find name={queue_name}] max-limit={up}M/{down}M");
        self.with_session(|session| Self::exec_line(session, &command))?;
        Ok(())
    }

    fn enable_rule(&self, rule_id: &str) -> Result<(), TransportError> {
        let command = format!("rule set [find name={rule_id}] disabled=no");
        self.with_session(|session| Self::exec_line(session, &command))?;
        Ok(())
    }

    fn disable_rule(&self, rule_id: &str) -> Result<(), TransportError> {
        let command = format!("rule set [find name={rule_id}] disabled=yes");
        self.with_session(|session| Self::exec_line(session, &command))?;
        Ok(())
    }
}

impl SshTransport {
    fn read_current_rates(&self, queue_name: &str) -> Result<(f64, f64), TransportError> {
        let command = format!("queue print detail {queue_name}");
        let output = self.with_session(|session| Self::exec_line(session, &command))?;
        let fields = parse_kv_lines(&output);
        let max_limit = fields.get("max-limit").cloned().unwrap_or_default();
        let (up, down) = max_limit
            .split_once('/')
            .map(|(u, d)| {
                (
                    u.trim_end_matches('M').parse().unwrap_or(0.0),
                    d.trim_end_matches('M').parse().unwrap_or(0.0),
                )
            })
            .unwrap_or((0.0, 0.0));
        Ok((up, down))
    }
}

fn dirs_known_hosts_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".ssh")
        .join("known_hosts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kv_lines_extracts_known_fields() {
        let output = "name=wan0\ndropped=12\nqueued=3\nbytes=40960\nmax-limit=100M/50M\n";
        let fields = parse_kv_lines(output);
        assert_eq!(fields.get("dropped").map(String::as_str), Some("12"));
        assert_eq!(fields.get("max-limit").map(String::as_str), Some("100M/50M"));
    }

    #[test]
    fn parse_kv_lines_ignores_malformed_lines() {
        let output = "not a kv line\ndropped=5\n";
        let fields = parse_kv_lines(output);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("dropped").map(String::as_str), Some("5"));
    }

    #[test]
    fn parse_u64_defaults_to_zero_on_missing_or_bad_value() {
        let fields = parse_kv_lines("dropped=not-a-number\n");
        assert_eq!(parse_u64(&fields, "dropped"), 0);
        assert_eq!(parse_u64(&fields, "missing"), 0);
    }
}
