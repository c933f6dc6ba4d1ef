use crate::net::endpoint_url;
use crate::LaunchError;
use crate::LaunchParams;
use crate::LauncherConfig;

/// Read the instance's resolved config and build its base URL.
pub fn resolve_endpoint(
    config: &LauncherConfig,
    params: &LaunchParams,
) -> Result<String, LaunchError> {
    let path = params.instance_dir.join(&config.config_file);
    let malformed = |reason: String| LaunchError::ConfigMalformed {
        index: params.index,
        path: path.clone(),
        reason,
    };

    let text = std::fs::read_to_string(&path).map_err(|source| LaunchError::ConfigUnreadable {
        index: params.index,
        path: path.clone(),
        source,
    })?;

    let document: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| malformed(e.to_string()))?;

    let port = document
        .pointer(&config.port_pointer)
        .ok_or_else(|| malformed(format!("no value at {}", config.port_pointer)))
        .and_then(|value| port_from_json(value).ok_or_else(|| malformed(format!("{value} is not a port"))))?;

    Ok(endpoint_url(&config.scheme, &config.host, port))
}

fn port_from_json(value: &serde_json::Value) -> Option<u16> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|port| *port != 0)
}
