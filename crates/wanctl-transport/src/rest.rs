//! REST-over-TLS router transport.
//!
//! Talks to the router's documented resource model: `PATCH`/`POST` against
//! named queue and rule resources. Modeled on a `ureq`-based uploader —
//! one shared `ureq::Agent` reused across calls, HTTP status mapped
//! straight to a retryable/terminal split.

use std::sync::Mutex;

use serde::Deserialize;
use wanctl_common::config::RouterConfig;

use crate::cake::CakeStats;
use crate::error::TransportError;
use crate::router::{Direction, RouterTransport};

/// The `RouterTransport` is the single point of serialization and must
/// enforce one outstanding command at a time per endpoint. The lock is
/// held for the duration of each call; its payload is unused, it exists
/// purely to serialize.
pub struct RestTransport {
    agent: ureq::Agent,
    base_url: String,
    auth: Option<(String, String)>,
    lock: Mutex<()>,
}

#[derive(Deserialize)]
struct RateSetResponse {
    #[allow(dead_code)]
    ok: bool,
}

impl RestTransport {
    pub fn new(config: &RouterConfig) -> Self {
        let scheme = "https";
        let base_url = format!("{scheme}://{}:{}/api", config.host, config.port);
        let agent = if config.verify_ssl {
            ureq::Agent::new_with_defaults()
        } else {
            // Honored only when the operator explicitly sets `verify_ssl: false`
            // in the WAN config — never the default.
            tracing::warn!(host = %config.host, "TLS certificate verification disabled for router REST transport");
            let tls_config = ureq::tls::TlsConfig::builder()
                .disable_verification(true)
                .build();
            let agent_config = ureq::config::Config::builder()
                .tls_config(tls_config)
                .build();
            ureq::Agent::new_with_config(agent_config)
        };
        let auth = match (&config.user, &config.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };
        RestTransport {
            agent,
            base_url,
            auth,
            lock: Mutex::new(()),
        }
    }

    fn basic_auth_header(&self) -> Option<String> {
        use std::fmt::Write as _;
        let (user, pass) = self.auth.as_ref()?;
        let raw = format!("{user}:{pass}");
        let mut encoded = String::new();
        let _ = write!(encoded, "{}", base64_encode(raw.as_bytes()));
        Some(format!("Basic {encoded}"))
    }

    fn classify_status(resource: &str, status: u16, body: String) -> TransportError {
        if (500..600).contains(&status) {
            TransportError::Retryable(format!("{resource}: HTTP {status}"))
        } else if status == 422 || status == 400 {
            TransportError::RejectedValue {
                resource: resource.to_string(),
                message: body,
            }
        } else {
            TransportError::Terminal(format!("{resource}: HTTP {status}: {body}"))
        }
    }
}

impl RouterTransport for RestTransport {
    fn read_stats(&self, queue_name: &str) -> Result<CakeStats, TransportError> {
        let _guard = self.lock.lock().unwrap();
        let url = format!("{}/queues/{queue_name}/stats", self.base_url);
        let mut req = self.agent.get(&url);
        if let Some(header) = self.basic_auth_header() {
            req = req.header("Authorization", &header);
        }
        match req.call() {
            Ok(mut resp) => {
                let status = resp.status().as_u16();
                if !(200..300).contains(&status) {
                    let body = resp.body_mut().read_to_string().unwrap_or_default();
                    return Err(Self::classify_status(queue_name, status, body));
                }
                resp.body_mut()
                    .read_json::<CakeStats>()
                    .map_err(|e| TransportError::Retryable(format!("malformed stats body: {e}")))
            }
            Err(e) => Err(TransportError::Retryable(format!("GET {url} failed: {e}"))),
        }
    }

    fn set_rate(
        &self,
        queue_name: &str,
        direction: Direction,
        mbps: f64,
    ) -> Result<(), TransportError> {
        let _guard = self.lock.lock().unwrap();
        let field = match direction {
            Direction::Download => "download_mbps",
            Direction::Upload => "upload_mbps",
        };
        let url = format!("{}/queues/{queue_name}/rate", self.base_url);
        let body = serde_json::json!({ field: mbps });
        let mut req = self.agent.patch(&url);
        if let Some(header) = self.basic_auth_header() {
            req = req.header("Authorization", &header);
        }
        match req.send_json(&body) {
            Ok(mut resp) => {
                let status = resp.status().as_u16();
                if !(200..300).contains(&status) {
                    let body = resp.body_mut().read_to_string().unwrap_or_default();
                    return Err(Self::classify_status(queue_name, status, body));
                }
                let _ = resp.body_mut().read_json::<RateSetResponse>();
                Ok(())
            }
            Err(e) => Err(TransportError::Retryable(format!("PATCH {url} failed: {e}"))),
        }
    }

    fn enable_rule(&self, rule_id: &str) -> Result<(), TransportError> {
        self.toggle_rule(rule_id, true)
    }

    fn disable_rule(&self, rule_id: &str) -> Result<(), TransportError> {
        self.toggle_rule(rule_id, false)
    }
}

impl RestTransport {
    fn toggle_rule(&self, rule_id: &str, enabled: bool) -> Result<(), TransportError> {
        let _guard = self.lock.lock().unwrap();
        let url = format!("{}/rules/{rule_id}", self.base_url);
        let body = serde_json::json!({ "enabled": enabled });
        let mut req = self.agent.patch(&url);
        if let Some(header) = self.basic_auth_header() {
            req = req.header("Authorization", &header);
        }
        match req.send_json(&body) {
            Ok(mut resp) => {
                let status = resp.status().as_u16();
                if !(200..300).contains(&status) {
                    let body = resp.body_mut().read_to_string().unwrap_or_default();
                    return Err(Self::classify_status(rule_id, status, body));
                }
                Ok(())
            }
            Err(e) => Err(TransportError::Retryable(format!("PATCH {url} failed: {e}"))),
        }
    }
}

/// Minimal RFC 4648 base64 encoder for the Basic-auth header. Pulled in by
/// hand rather than as a dependency since it's eight lines and the only
/// place this crate needs it.
fn base64_encode(input: &[u8]) -> String {
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((input.len() + 2) / 3 * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = (u32::from(b0) << 16) | (u32::from(b1) << 8) | u32::from(b2);
        out.push(ALPHABET[(n >> 18 & 0x3F) as usize] as char);
        out.push(ALPHABET[(n >> 12 & 0x3F) as usize] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(n >> 6 & 0x3F) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[(n & 0x3F) as usize] as char
        } else {
            '='
        });
    }
    out
}
