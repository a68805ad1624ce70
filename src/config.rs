use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::client::ClientConfig;

const ENV_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
const ENV_CLIENT_ID: &str = "GOOGLE_MAPS_CLIENT_ID";
const ENV_SIGNING_KEY: &str = "GOOGLE_MAPS_SIGNING_KEY";
const ENV_RC: &str = "GMAPS_TIMEZONE_RC";
const RC_FILE_NAME: &str = ".gmaps-timezone-rc";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    api_key: Option<String>,
    client_id: Option<String>,
    signing_key: Option<String>,
}

pub(crate) fn load_config(
    api_key: Option<String>,
    client_id: Option<String>,
    signing_key: Option<String>,
) -> Result<ClientConfig> {
    load_config_from(
        ClientConfig { api_key, client_id, signing_key },
        |name| std::env::var(name).ok(),
        &rc_candidates(),
    )
}

/// Fill each missing field from the environment, then from the first rc file found.
///
/// Credentials are optional: a request without them is still sent and the
/// service answers `REQUEST_DENIED`.
fn load_config_from(
    explicit: ClientConfig,
    env: impl Fn(&str) -> Option<String>,
    rc_candidates: &[PathBuf],
) -> Result<ClientConfig> {
    let from_env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let mut cfg = ClientConfig {
        api_key: non_empty(explicit.api_key).or_else(|| from_env(ENV_API_KEY)),
        client_id: non_empty(explicit.client_id).or_else(|| from_env(ENV_CLIENT_ID)),
        signing_key: non_empty(explicit.signing_key).or_else(|| from_env(ENV_SIGNING_KEY)),
    };

    if cfg.api_key.is_none() || cfg.client_id.is_none() || cfg.signing_key.is_none() {
        for rc_path in rc_candidates {
            if rc_path.exists() {
                let rc = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;
                debug!(path = %rc_path.display(), "loaded credentials file");

                cfg.api_key = cfg.api_key.or(rc.api_key);
                cfg.client_id = cfg.client_id.or(rc.client_id);
                cfg.signing_key = cfg.signing_key.or(rc.signing_key);
                break;
            }
        }
    }

    if cfg.api_key.is_none() && (cfg.client_id.is_none() || cfg.signing_key.is_none()) {
        debug!(
            "no credentials configured (set {ENV_API_KEY}, or {ENV_CLIENT_ID} and {ENV_SIGNING_KEY})"
        );
    }

    Ok(cfg)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // A name may stand alone on its line with the value on the next one.
    let mut pending: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(name) = pending.take() {
            if !line.contains(':') {
                set_field(&mut cfg, name, strip_quotes(line));
                continue;
            }
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = strip_quotes(value.trim());
            if value.is_empty() {
                pending = Some(name);
            } else {
                set_field(&mut cfg, name, value);
            }
        }
    }

    cfg
}

fn set_field(cfg: &mut RcConfig, name: &str, value: &str) {
    let value = Some(value.to_string());
    match name {
        "key" | "api_key" => cfg.api_key = value,
        "client" | "client_id" => cfg.client_id = value,
        "signing_key" => cfg.signing_key = value,
        _ => {}
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) GMAPS_TIMEZONE_RC (explicit)
    // 2) ./.gmaps-timezone-rc
    // 3) ~/.gmaps-timezone-rc
    if let Ok(p) = std::env::var(ENV_RC) {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_FILE_NAME));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| map.get(name).cloned()
    }

    fn temp_rc(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "gmaps-timezone-{}-{}.rc",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_rc_with_comments_quotes_and_continuation_lines() {
        let rc = parse_rc(
            "# business account\n\
             client: 'gme-test'\n\
             signing_key:\n\
             \"vNIXE0xscrmjlyV-12Nj_BvUPaw=\"\n\
             key: AIza-local\n\
             unknown: ignored\n",
        );
        assert_eq!(
            rc,
            RcConfig {
                api_key: Some("AIza-local".into()),
                client_id: Some("gme-test".into()),
                signing_key: Some("vNIXE0xscrmjlyV-12Nj_BvUPaw=".into()),
            }
        );
    }

    #[test]
    fn explicit_beats_env_beats_rc() {
        let rc = temp_rc("precedence", "key: FROM_RC\nclient: rc-client\nsigning_key: rc-sk\n");
        let env = env_of(&[(ENV_API_KEY, "FROM_ENV"), (ENV_CLIENT_ID, "env-client")]);

        let cfg = load_config_from(
            ClientConfig { api_key: Some("EXPLICIT".into()), ..Default::default() },
            env,
            &[rc.clone()],
        )
        .unwrap();

        assert_eq!(cfg.api_key.as_deref(), Some("EXPLICIT"));
        assert_eq!(cfg.client_id.as_deref(), Some("env-client"));
        assert_eq!(cfg.signing_key.as_deref(), Some("rc-sk"));
        std::fs::remove_file(rc).ok();
    }

    #[test]
    fn blank_values_count_as_missing() {
        let cfg = load_config_from(
            ClientConfig { api_key: Some("  ".into()), ..Default::default() },
            env_of(&[(ENV_API_KEY, ""), (ENV_CLIENT_ID, "env-client")]),
            &[],
        )
        .unwrap();

        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.client_id.as_deref(), Some("env-client"));
    }

    #[test]
    fn missing_credentials_are_not_an_error() {
        let missing = std::env::temp_dir().join("gmaps-timezone-does-not-exist.rc");
        let cfg = load_config_from(ClientConfig::default(), env_of(&[]), &[missing]).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn only_first_existing_rc_is_read() {
        let first = temp_rc("first", "key: FIRST\n");
        let second = temp_rc("second", "key: SECOND\nclient: second-client\n");

        let cfg =
            load_config_from(ClientConfig::default(), env_of(&[]), &[first.clone(), second.clone()])
                .unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("FIRST"));
        assert_eq!(cfg.client_id, None);

        std::fs::remove_file(first).ok();
        std::fs::remove_file(second).ok();
    }
}
