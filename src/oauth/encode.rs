use std::fmt::Write as _;

/// Bytes left untouched by [`encode_host_component`] besides ASCII
/// alphanumerics. Unlike the host set, `'` is escaped: URL parsing escapes
/// it inside a query, and the authorize URL and token body must agree.
const HOST_SAFE: &[u8] = b"!$&()*+,-.:;=[]_~";

fn is_host_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || HOST_SAFE.contains(&byte)
}

/// Percent-encode everything outside the URL host character set.
///
/// This is the encoding applied to redirect URIs before they are placed in
/// the authorize URL and in the token exchange body; both places must see
/// the same string or the provider rejects the exchange.
pub fn encode_host_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if is_host_safe(byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}
