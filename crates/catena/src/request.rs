//! Request strings: the `!`-separated notation naming a loader chain and
//! its resource.
//!
//! The derivation functions are pure: they take the identity list, the
//! cursor, and the resource path explicitly, so every view a loader can
//! observe during a run is testable in isolation.

/// Separator between loader identities and the resource path
pub const SEPARATOR: char = '!';

fn join<S: AsRef<str>>(identities: &[S], resource: Option<&str>) -> String {
    let mut parts: Vec<&str> = identities.iter().map(AsRef::as_ref).collect();
    if let Some(resource) = resource {
        parts.push(resource);
    }
    parts.join("!")
}

/// The full request: every loader identity plus the resource
pub fn full_request<S: AsRef<str>>(identities: &[S], resource: &str) -> String {
    join(identities, Some(resource))
}

/// The request still ahead of the cursor: identities after the current
/// loader, plus the resource
pub fn remaining_request<S: AsRef<str>>(identities: &[S], cursor: usize, resource: &str) -> String {
    let rest = identities.get(cursor + 1..).unwrap_or(&[]);
    join(rest, Some(resource))
}

/// The request from the cursor onward: the current loader, those after it,
/// and the resource
pub fn current_request<S: AsRef<str>>(identities: &[S], cursor: usize, resource: &str) -> String {
    let rest = identities.get(cursor..).unwrap_or(&[]);
    join(rest, Some(resource))
}

/// The request already behind the cursor: identities before the current
/// loader, without the resource
pub fn previous_request<S: AsRef<str>>(identities: &[S], cursor: usize) -> String {
    let seen = identities.get(..cursor).unwrap_or(identities);
    join(seen, None)
}

/// Which configured-rule buckets a request prefix selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPrefix {
    /// No prefix: post + inline + normal + pre
    None,
    /// `!`: post + normal + pre, inline loaders dropped
    SkipInline,
    /// `-!`: post + pre, normal rules and inline loaders dropped
    SkipNormal,
    /// `!!`: inline loaders only, all configured rules dropped
    InlineOnly,
}

/// A request string taken apart into its prefix, inline loader identities,
/// and resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    pub prefix: RequestPrefix,
    pub inline_loaders: Vec<String>,
    pub resource: String,
}

/// Split a request string. The last `!`-separated segment is the resource;
/// everything before it names inline loaders.
pub fn split_request(request: &str) -> SplitRequest {
    let (prefix, rest) = if let Some(rest) = request.strip_prefix("!!") {
        (RequestPrefix::InlineOnly, rest)
    } else if let Some(rest) = request.strip_prefix("-!") {
        (RequestPrefix::SkipNormal, rest)
    } else if let Some(rest) = request.strip_prefix('!') {
        (RequestPrefix::SkipInline, rest)
    } else {
        (RequestPrefix::None, request)
    };
    let rest = rest.trim_start_matches(SEPARATOR);

    let mut segments: Vec<&str> = rest.split(SEPARATOR).collect();
    let resource = segments.pop().unwrap_or_default().to_owned();
    SplitRequest {
        prefix,
        inline_loaders: segments.into_iter().map(str::to_owned).collect(),
        resource,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 3] = ["a-loader", "b-loader", "c-loader"];

    #[test]
    fn test_full_request() {
        assert_eq!(full_request(&IDS, "src/x.js"), "a-loader!b-loader!c-loader!src/x.js");
        assert_eq!(full_request::<&str>(&[], "src/x.js"), "src/x.js");
    }

    #[test]
    fn test_remaining_request() {
        assert_eq!(remaining_request(&IDS, 0, "x"), "b-loader!c-loader!x");
        assert_eq!(remaining_request(&IDS, 2, "x"), "x");
        // Cursor past the end still yields just the resource
        assert_eq!(remaining_request(&IDS, 3, "x"), "x");
    }

    #[test]
    fn test_current_request() {
        assert_eq!(current_request(&IDS, 0, "x"), "a-loader!b-loader!c-loader!x");
        assert_eq!(current_request(&IDS, 2, "x"), "c-loader!x");
        assert_eq!(current_request(&IDS, 3, "x"), "x");
    }

    #[test]
    fn test_previous_request() {
        assert_eq!(previous_request(&IDS, 0), "");
        assert_eq!(previous_request(&IDS, 2), "a-loader!b-loader");
        assert_eq!(previous_request(&IDS, 3), "a-loader!b-loader!c-loader");
    }

    #[test]
    fn test_split_plain_request() {
        let split = split_request("a!b!src/index.js");
        assert_eq!(split.prefix, RequestPrefix::None);
        assert_eq!(split.inline_loaders, vec!["a", "b"]);
        assert_eq!(split.resource, "src/index.js");
    }

    #[test]
    fn test_split_resource_only() {
        let split = split_request("src/index.js");
        assert_eq!(split.prefix, RequestPrefix::None);
        assert!(split.inline_loaders.is_empty());
        assert_eq!(split.resource, "src/index.js");
    }

    #[test]
    fn test_split_prefixes() {
        assert_eq!(split_request("!!a!r").prefix, RequestPrefix::InlineOnly);
        assert_eq!(split_request("-!r").prefix, RequestPrefix::SkipNormal);
        assert_eq!(split_request("!a!r").prefix, RequestPrefix::SkipInline);
        assert_eq!(split_request("a!r").prefix, RequestPrefix::None);
    }

    #[test]
    fn test_split_prefix_keeps_loaders() {
        let split = split_request("!!inline-a!inline-b!src/x.js");
        assert_eq!(split.inline_loaders, vec!["inline-a", "inline-b"]);
        assert_eq!(split.resource, "src/x.js");
    }
}
