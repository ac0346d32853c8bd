// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Percent-encode a value for a form body.
pub fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Form body from raw field values.
pub fn form_body(name: &str, email: &str, phone: &str, message: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("name", name)
        .append_pair("email", email)
        .append_pair("phone", phone)
        .append_pair("message", message)
        .finish()
}

/// Email values that try to smuggle extra mail headers.
pub fn header_injection_emails() -> Vec<&'static str> {
    vec![
        "jo@example.com\r\nBcc: victim@example.com",
        "jo@example.com\nBcc: victim@example.com",
        "jo@example.com\rCc: victim@example.com",
        "jo@example.com%0d%0aBcc: victim@example.com",
        "jo@example.com\r\n\r\nInjected body",
    ]
}

/// Names that try to smuggle extra mail headers.
pub fn header_injection_names() -> Vec<&'static str> {
    vec![
        "Jo\r\nBcc: victim@example.com",
        "Jo\nSubject: Free money",
        "Jo\r\nContent-Type: text/html",
    ]
}

/// Markup that must never be echoed back unsanitized.
pub fn script_payloads() -> Vec<&'static str> {
    vec![
        "<script>alert(1)</script>",
        "<SCRIPT src=//evil.example/x.js></SCRIPT>",
        "<img src=x onerror=\"alert(1)\">",
        "<style>body{display:none}</style>",
        "<!-- <script>alert(1)</script> -->",
        "<a href=\"javascript:alert(1)\" onclick='steal()'>click</a>",
        "<iframe src=\"//evil.example\"></iframe>",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("Jo Bloggs"), "Jo+Bloggs");
        assert_eq!(form_encode("a@b.c\r\n"), "a%40b.c%0D%0A");
        assert_eq!(form_encode("é"), "%C3%A9");
        assert_eq!(form_encode("a&b=c%"), "a%26b%3Dc%25");
    }

    #[test]
    fn test_form_body_decodes_to_fields() {
        let body = form_body("Jo & Co", "jo@example.com\r\nBcc: x", "", "50% = half");
        let pairs: Vec<(String, String)> = form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "Jo & Co".to_string()),
                ("email".to_string(), "jo@example.com\r\nBcc: x".to_string()),
                ("phone".to_string(), String::new()),
                ("message".to_string(), "50% = half".to_string()),
            ]
        );
    }
}
