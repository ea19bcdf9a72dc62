//! Host-pattern matching: selects a backend port for a client's `Host`
//! header value against the operator's routing table.

/// Runs the `s`-against-`t` comparison described in spec.md §4.3: `s` is
/// the pattern's prefix (everything before `@`), `t` is the client's raw
/// `Host` value (never percent-decoded, and not necessarily valid UTF-8). A
/// match requires every byte of the prefix to equal the corresponding byte
/// of `t`, and the byte of `t` immediately following the prefix to be one
/// of `.`, `:`, `/`, or end-of-string.
///
/// Mirrors `hostcmp` in the original, minus the decision of *which* port it
/// yields (the caller already knows the port once the prefix matches).
fn prefix_matches(prefix: &str, host: &[u8]) -> bool {
    let prefix = prefix.as_bytes();
    if host.len() < prefix.len() {
        return false;
    }
    if &host[..prefix.len()] != prefix {
        return false;
    }
    match host.get(prefix.len()) {
        None => true,
        Some(b'.') | Some(b':') | Some(b'/') => true,
        _ => false,
    }
}

/// One `<prefix>@<port>` routing-table entry.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub prefix: String,
    pub port: u16,
}

/// The operator-supplied routing table: immutable, ordered, read-only
/// after startup. Declaration order is significant — the first matching
/// entry wins.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Returns the backend port for the first entry whose prefix matches
    /// `host`, in declaration order. `None` means no entry matched: the
    /// spec requires the caller reject with `400 Bad Request` rather than
    /// carry forward an uninitialized port (see spec.md §4.3 and §9's
    /// open question on the original's behavior here).
    pub fn match_host(&self, host: &[u8]) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| prefix_matches(&e.prefix, host))
            .map(|e| e.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, u16)]) -> RoutingTable {
        RoutingTable::new(
            pairs
                .iter()
                .map(|(p, port)| RouteEntry {
                    prefix: p.to_string(),
                    port: *port,
                })
                .collect(),
        )
    }

    #[test]
    fn matches_dotted_host() {
        let t = table(&[("www", 9000)]);
        assert_eq!(t.match_host(b"www.example.com"), Some(9000));
    }

    #[test]
    fn matches_host_with_port() {
        let t = table(&[("www", 9000)]);
        assert_eq!(t.match_host(b"www.example.com:8080"), Some(9000));
    }

    #[test]
    fn matches_exact_host() {
        let t = table(&[("jer", 9000)]);
        assert_eq!(t.match_host(b"jer"), Some(9000));
    }

    #[test]
    fn rejects_longer_unrelated_suffix() {
        let t = table(&[("www", 9000)]);
        assert_eq!(t.match_host(b"wwwaaaa.luigi.co"), None);
    }

    #[test]
    fn first_matching_entry_wins() {
        let t = table(&[("www", 1111), ("www", 2222)]);
        assert_eq!(t.match_host(b"www.example.com"), Some(1111));
    }

    #[test]
    fn no_entry_matches_is_none() {
        let t = table(&[("www", 9000)]);
        assert_eq!(t.match_host(b"other.example.com"), None);
    }

    #[test]
    fn host_shorter_than_prefix_does_not_match() {
        let t = table(&[("wwwlong", 9000)]);
        assert_eq!(t.match_host(b"www"), None);
    }

    #[test]
    fn raw_high_byte_after_prefix_does_not_match() {
        // Host values are never percent-decoded, so a raw byte >= 0x80 is
        // legal on the wire and must compare by byte, not by valid UTF-8;
        // it isn't one of the accepted boundary bytes, so no match.
        let t = table(&[("h", 9000)]);
        assert_eq!(t.match_host(b"h\xE9"), None);
    }

    #[test]
    fn raw_high_byte_inside_host_compares_by_byte() {
        let t = table(&[("h\u{e9}", 9000)]);
        assert_eq!(t.match_host("h\u{e9}.example.com".as_bytes()), Some(9000));
    }
}
