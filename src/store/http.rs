//! HashiCorp-Vault compatible HTTP client.
//!
//! Talks to the REST API with blocking requests (`ureq`).  Both KV
//! engine versions are supported; the version of each mount is read
//! from the mount table on first use and cached for the client's
//! lifetime.
//!
//! | operation | KV v2                               | KV v1                   |
//! |-----------|-------------------------------------|-------------------------|
//! | list      | `GET {mount}/metadata/{path}?list`  | `GET {mount}/{path}?list` |
//! | read      | `GET {mount}/data/{path}` → `data.data` | `GET {mount}/{path}` → `data` |
//! | write     | `POST {mount}/data/{path}` `{"data": …}` | `POST {mount}/{path}` |

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use tracing::debug;
use ureq::Agent;

use super::{normalize_mount, FieldMap, MountInfo, SecretStore, SEPARATOR};
use crate::errors::{Result, VaultKeepError};

/// Characters left unescaped inside one path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection settings for `VaultClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base address, e.g. `http://127.0.0.1:8200`.
    pub address: String,
    /// Token sent as `X-Vault-Token`.
    pub token: String,
    /// Enterprise namespace sent as `X-Vault-Namespace`.
    pub namespace: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// KV engine API flavour of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    /// A listed mount without `options.version` is KV v1.  Mounts
    /// missing from the table (the token could not read it) are
    /// assumed to be v2.
    fn of(info: Option<&MountInfo>) -> Self {
        match info {
            None => KvVersion::V2,
            Some(info) => match info.version.as_deref() {
                Some("2") => KvVersion::V2,
                _ => KvVersion::V1,
            },
        }
    }
}

/// Blocking client for a Vault server.
pub struct VaultClient {
    agent: Agent,
    config: ClientConfig,
    mounts: Mutex<Option<BTreeMap<String, MountInfo>>>,
}

impl VaultClient {
    /// Build a client; no request is made until the first operation.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.address.trim().is_empty() {
            return Err(VaultKeepError::ConfigError(
                "secret store address cannot be empty".into(),
            ));
        }
        if config.token.is_empty() {
            return Err(VaultKeepError::ConfigError(
                "a token is required — use --token or VAULT_TOKEN".into(),
            ));
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            config,
            mounts: Mutex::new(None),
        })
    }

    /// The configured base address.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    fn url(&self, api_path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.address.trim_end_matches(SEPARATOR),
            api_path
        )
    }

    fn get(&self, api_path: &str, list: bool) -> Result<Value> {
        let url = self.url(api_path);
        let mut request = self
            .agent
            .get(url.as_str())
            .header("X-Vault-Token", self.config.token.as_str());
        if let Some(ns) = &self.config.namespace {
            request = request.header("X-Vault-Namespace", ns.as_str());
        }
        if list {
            request = request.query("list", "true");
        }

        let mut response = request.call().map_err(|e| transport_error(&url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error(&url, &e))?;
        parse_response(status, &body, api_path)
    }

    fn post(&self, api_path: &str, payload: &Value) -> Result<()> {
        let url = self.url(api_path);
        let mut request = self
            .agent
            .post(url.as_str())
            .header("X-Vault-Token", self.config.token.as_str());
        if let Some(ns) = &self.config.namespace {
            request = request.header("X-Vault-Namespace", ns.as_str());
        }

        let mut response = request
            .send_json(payload)
            .map_err(|e| transport_error(&url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| transport_error(&url, &e))?;
        parse_response(status, &body, api_path).map(|_| ())
    }

    /// KV version of `mount`, loading the mount table once.
    ///
    /// Tokens scoped to a single mount often cannot read `sys/mounts`;
    /// in that case every mount is assumed to be KV v2.
    fn kv_version(&self, mount: &str) -> Result<KvVersion> {
        let mut cache = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.is_none() {
            let table = match self.fetch_mounts() {
                Ok(table) => table,
                Err(VaultKeepError::Authorization(reason)) => {
                    debug!("cannot read mount table ({reason}), assuming KV v2");
                    BTreeMap::new()
                }
                Err(e) => return Err(e),
            };
            *cache = Some(table);
        }
        Ok(KvVersion::of(cache.as_ref().and_then(|t| t.get(mount))))
    }

    fn fetch_mounts(&self) -> Result<BTreeMap<String, MountInfo>> {
        let body = self.get("sys/mounts", false)?;
        Ok(parse_mount_table(&body))
    }
}

impl SecretStore for VaultClient {
    fn verify_access(&self) -> Result<()> {
        self.get("auth/token/lookup-self", false).map(|_| ())
    }

    fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>> {
        let table = self.fetch_mounts()?;
        *self.mounts.lock().unwrap_or_else(PoisonError::into_inner) = Some(table.clone());
        Ok(table)
    }

    fn list_children(&self, mount: &str, path: &str) -> Result<Vec<String>> {
        let route = match self.kv_version(mount)? {
            KvVersion::V2 => api_path(mount, Some("metadata"), path),
            KvVersion::V1 => api_path(mount, None, path),
        };
        let body = self.get(&route, true)?;
        let keys = body
            .pointer("/data/keys")
            .and_then(Value::as_array)
            .ok_or_else(|| VaultKeepError::NotFound(format!("{mount}/{path} is not a folder")))?;
        Ok(keys
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    fn read_secret(&self, mount: &str, path: &str) -> Result<FieldMap> {
        let (route, pointer) = match self.kv_version(mount)? {
            KvVersion::V2 => (api_path(mount, Some("data"), path), "/data/data"),
            KvVersion::V1 => (api_path(mount, None, path), "/data"),
        };
        let body = self.get(&route, false)?;
        // A soft-deleted v2 secret answers 404 with `data.data: null`.
        body.pointer(pointer)
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| VaultKeepError::NotFound(format!("no secret at {mount}/{path}")))
    }

    fn write_secret(&self, mount: &str, path: &str, data: &FieldMap) -> Result<()> {
        match self.kv_version(mount)? {
            KvVersion::V2 => self.post(
                &api_path(mount, Some("data"), path),
                &json!({ "data": data }),
            ),
            KvVersion::V1 => self.post(&api_path(mount, None, path), &Value::Object(data.clone())),
        }
    }
}

/// Build `mount[/infix]/path` with every segment percent-encoded.
fn api_path(mount: &str, infix: Option<&str>, path: &str) -> String {
    let mut out = encode_segments(mount);
    if let Some(infix) = infix {
        out.push(SEPARATOR);
        out.push_str(infix);
    }
    let encoded = encode_segments(path);
    if !encoded.is_empty() {
        out.push(SEPARATOR);
        out.push_str(&encoded);
    }
    out
}

fn encode_segments(path: &str) -> String {
    path.split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn transport_error(url: &str, err: &ureq::Error) -> VaultKeepError {
    VaultKeepError::Connectivity(format!("{url}: {err}"))
}

/// Turn an HTTP status and body into a JSON value or a typed error.
fn parse_response(status: u16, body: &str, what: &str) -> Result<Value> {
    if (200..300).contains(&status) {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(body).map_err(|e| VaultKeepError::Store {
            status,
            message: format!("unreadable response for {what}: {e}"),
        });
    }

    let message = error_message(body).unwrap_or_else(|| what.to_string());
    Err(match status {
        404 => VaultKeepError::NotFound(what.to_string()),
        401 | 403 => VaultKeepError::Authorization(format!("{what}: {message}")),
        _ => VaultKeepError::Store { status, message },
    })
}

/// Join the `errors` array Vault puts in failure responses.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let errors: Vec<&str> = value
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

/// Parse a `sys/mounts` response.
///
/// Newer servers nest the table under `data`; older ones put the
/// mounts at the top level next to request metadata.
fn parse_mount_table(body: &Value) -> BTreeMap<String, MountInfo> {
    let table = body
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| body.as_object());

    let Some(table) = table else {
        return BTreeMap::new();
    };

    table
        .iter()
        .filter_map(|(name, entry)| {
            let engine_type = entry.get("type")?.as_str()?.to_string();
            let version = entry
                .pointer("/options/version")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some((
                normalize_mount(name).to_string(),
                MountInfo {
                    engine_type,
                    version,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str, token: &str) -> ClientConfig {
        ClientConfig {
            address: address.to_string(),
            token: token.to_string(),
            namespace: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn new_requires_token() {
        assert!(VaultClient::new(config("http://127.0.0.1:8200", "")).is_err());
        assert!(VaultClient::new(config("http://127.0.0.1:8200", "root")).is_ok());
    }

    #[test]
    fn url_strips_trailing_slash_from_address() {
        let client = VaultClient::new(config("http://vault:8200/", "root")).unwrap();
        assert_eq!(client.url("sys/mounts"), "http://vault:8200/v1/sys/mounts");
    }

    #[test]
    fn api_path_builds_kv_v2_routes() {
        assert_eq!(api_path("secret", Some("data"), "team/app"), "secret/data/team/app");
        assert_eq!(api_path("secret", Some("metadata"), ""), "secret/metadata");
        assert_eq!(api_path("kv", None, "a/b"), "kv/a/b");
    }

    #[test]
    fn api_path_escapes_segments() {
        assert_eq!(api_path("secret", Some("data"), "my app/x"), "secret/data/my%20app/x");
    }

    #[test]
    fn parse_response_maps_statuses() {
        assert!(parse_response(404, "{\"errors\":[]}", "x").unwrap_err().is_not_found());
        assert!(matches!(
            parse_response(403, "{\"errors\":[\"permission denied\"]}", "x"),
            Err(VaultKeepError::Authorization(msg)) if msg.contains("permission denied")
        ));
        assert!(matches!(
            parse_response(500, "{\"errors\":[\"internal\"]}", "x"),
            Err(VaultKeepError::Store { status: 500, .. })
        ));
        assert_eq!(parse_response(204, "", "x").unwrap(), Value::Null);
    }

    #[test]
    fn mount_table_keeps_type_and_version() {
        let body = json!({
            "request_id": "abc",
            "data": {
                "secret/": {"type": "kv", "options": {"version": "2"}},
                "legacy/": {"type": "kv", "options": {"version": "1"}},
                "sys/": {"type": "system", "options": null}
            }
        });
        let table = parse_mount_table(&body);
        assert_eq!(table["secret"], MountInfo::kv("2"));
        assert_eq!(table["legacy"].version.as_deref(), Some("1"));
        assert_eq!(table["sys"].engine_type, "system");
        assert_eq!(table["sys"].version, None);
    }

    #[test]
    fn mount_table_without_data_wrapper() {
        let body = json!({
            "request_id": "abc",
            "cubbyhole/": {"type": "cubbyhole"},
            "secret/": {"type": "kv", "options": {"version": "2"}}
        });
        let table = parse_mount_table(&body);
        assert_eq!(table.len(), 2);
        assert!(table["secret"].is_kv());
    }

    #[test]
    fn kv_version_defaults_to_v2_only_for_unlisted_mounts() {
        assert_eq!(KvVersion::of(None), KvVersion::V2);
        assert_eq!(KvVersion::of(Some(&MountInfo::kv("2"))), KvVersion::V2);
        assert_eq!(KvVersion::of(Some(&MountInfo::kv("1"))), KvVersion::V1);
    }

    #[test]
    fn kv_mount_without_version_is_v1() {
        let table = parse_mount_table(&json!({
            "data": {
                "kv/": {"type": "kv", "options": null},
                "plain/": {"type": "kv", "options": {}},
            }
        }));
        assert_eq!(table["kv"].version, None);
        assert_eq!(KvVersion::of(table.get("kv")), KvVersion::V1);
        assert_eq!(KvVersion::of(table.get("plain")), KvVersion::V1);
        assert_eq!(KvVersion::of(table.get("missing")), KvVersion::V2);
    }
}
