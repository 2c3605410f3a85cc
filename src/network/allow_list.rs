/// Parsed URL components
struct ParsedUrl {
    origin: String,   // e.g., "https://api.example.com" or "http://localhost:3000"
    pathname: String,  // e.g., "/v1/users" or "/"
}

/// Parse a URL string into components. Returns None if invalid.
/// Supports http:// and https:// URLs.
/// Origin = scheme + "://" + host + optional_port
/// Pathname = path portion (defaults to "/" if none)
fn parse_url(url_string: &str) -> Option<ParsedUrl> {
    // Find scheme
    let scheme_end = url_string.find("://")?;
    let scheme = &url_string[..scheme_end];
    if scheme != "http" && scheme != "https" {
        // Still parse it, but validate_allow_list will reject non-http(s)
    }

    let after_scheme = &url_string[scheme_end + 3..];

    // Find host+port (up to first / or end of string)
    let (authority, pathname) = if let Some(slash_pos) = after_scheme.find('/') {
        (&after_scheme[..slash_pos], &after_scheme[slash_pos..])
    } else {
        (after_scheme, "/")
    };

    if authority.is_empty() {
        return None;
    }

    // Strip query string and fragment from pathname
    let pathname = pathname.split('?').next().unwrap_or("/");
    let pathname = pathname.split('#').next().unwrap_or("/");

    Some(ParsedUrl {
        origin: format!("{}://{}", scheme, authority),
        pathname: pathname.to_string(),
    })
}

/// Check if a URL matches an allow-list entry.
/// Rules:
/// 1. Origins must match, case-folded on scheme and host (not on path)
/// 2. URL path must start with entry's path at a directory boundary
/// 3. If entry has no path (or just "/"), all paths allowed
pub fn matches_allow_list_entry(url: &str, allowed_entry: &str) -> bool {
    let parsed_url = match parse_url(url) {
        Some(p) => p,
        None => return false,
    };
    let parsed_entry = match parse_url(allowed_entry) {
        Some(p) => p,
        None => return false,
    };

    // Origins match case-insensitively on scheme+host; paths stay case-sensitive.
    if parsed_url.origin.to_ascii_lowercase() != parsed_entry.origin.to_ascii_lowercase() {
        return false;
    }

    // If entry path is "/" or empty, allow all paths
    if parsed_entry.pathname == "/" || parsed_entry.pathname.is_empty() {
        return true;
    }

    // URL path must match the entry's path prefix at a directory boundary:
    // "/v1" matches "/v1" and "/v1/anything" but not "/v1extra".
    if parsed_entry.pathname.ends_with('/') {
        parsed_url.pathname.starts_with(&parsed_entry.pathname)
    } else {
        parsed_url.pathname == parsed_entry.pathname
            || parsed_url
                .pathname
                .starts_with(&format!("{}/", parsed_entry.pathname))
    }
}

/// Check if a URL is allowed by any entry in the allow-list.
pub fn is_url_allowed(url: &str, allowed_url_prefixes: &[String]) -> bool {
    if allowed_url_prefixes.is_empty() {
        return false;
    }
    allowed_url_prefixes
        .iter()
        .any(|entry| matches_allow_list_entry(url, entry))
}

/// Validate allow-list configuration. Returns error messages for invalid entries.
pub fn validate_allow_list(allowed_url_prefixes: &[String]) -> Vec<String> {
    let mut errors = Vec::new();
    for entry in allowed_url_prefixes {
        let parsed = parse_url(entry);
        if parsed.is_none() {
            errors.push(format!(
                "Invalid URL in allow-list: \"{}\" - must be a valid URL with scheme and host",
                entry
            ));
            continue;
        }

        // Check scheme
        let scheme = entry.split("://").next().unwrap_or("");
        if scheme != "http" && scheme != "https" {
            errors.push(format!(
                "Only http and https URLs are allowed in allow-list: \"{}\"",
                entry
            ));
            continue;
        }

        // Check for hostname
        let after_scheme = &entry[scheme.len() + 3..];
        let authority = after_scheme.split('/').next().unwrap_or("");
        if authority.is_empty() {
            errors.push(format!(
                "Allow-list entry must include a hostname: \"{}\"",
                entry
            ));
            continue;
        }

        // Warn about query strings and fragments
        if entry.contains('?') || entry.contains('#') {
            errors.push(format!(
                "Query strings and fragments are ignored in allow-list entries: \"{}\"",
                entry
            ));
        }
    }
    errors
}
