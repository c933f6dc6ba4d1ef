/// Join a base URL and an absolute path without doubling the slash.
pub fn join_url(
    base: &str,
    path: &str,
) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Base URL of an instance: `<scheme>://<host>:<port>`
pub fn endpoint_url(
    scheme: &str,
    host: &str,
    port: u16,
) -> String {
    let normalized = host
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    format!("{scheme}://{normalized}:{port}")
}
