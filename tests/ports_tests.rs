use hookgate::ports::{effective_port, is_allowed_scheme, is_bad_port, BAD_PORTS};
use url::Url;

#[test]
fn test_bad_port_membership() {
    for port in [1, 7, 21, 22, 23, 25, 53, 101, 104, 110, 512, 515, 530, 532, 587, 993, 2049, 5060, 6000, 6665, 6669, 6697, 10080] {
        assert!(is_bad_port(port), "port {} should be blocked", port);
    }

    for port in [0, 2, 80, 443, 3000, 6664, 6670, 8080, 8443, 10081, 65535] {
        assert!(!is_bad_port(port), "port {} should be allowed", port);
    }
}

#[test]
fn test_bad_port_list_matches_fetch_standard() {
    let expected: &[u16] = &[
        1, 7, 9, 11, 13, 15, 17, 19, 20, 21, 22, 23, 25, 37, 42, 43, 53, 69, 77, 79, 87, 95, 101,
        102, 103, 104, 109, 110, 111, 113, 115, 117, 119, 123, 135, 137, 139, 143, 161, 179, 389,
        427, 465, 512, 513, 514, 515, 526, 530, 531, 532, 540, 548, 554, 556, 563, 587, 601, 636,
        989, 990, 993, 995, 1719, 1720, 1723, 2049, 3659, 4045, 4190, 5060, 5061, 6000, 6566,
        6665, 6666, 6667, 6668, 6669, 6679, 6697, 10080,
    ];
    assert_eq!(BAD_PORTS, expected);
}

#[test]
fn test_effective_port() {
    let url = Url::parse("http://example.com/").unwrap();
    assert_eq!(effective_port(&url), Some(80));

    let url = Url::parse("https://example.com/").unwrap();
    assert_eq!(effective_port(&url), Some(443));

    let url = Url::parse("https://example.com:8443/").unwrap();
    assert_eq!(effective_port(&url), Some(8443));

    let url = Url::parse("ftp://example.com/").unwrap();
    assert_eq!(effective_port(&url), Some(21));
    assert!(is_bad_port(21));
}

#[test]
fn test_allowed_schemes() {
    assert!(is_allowed_scheme("http"));
    assert!(is_allowed_scheme("https"));
    for scheme in ["file", "mailto", "ftp", "ws", "javascript", ""] {
        assert!(!is_allowed_scheme(scheme), "{} should not be allowed", scheme);
    }
}
