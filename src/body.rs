//! Response body decoding helpers.

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use http::header::{CONTENT_ENCODING, SET_COOKIE};
use http::HeaderMap;

use crate::{Error, Result};

pub(crate) fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false)
}

/// Turns raw response bytes into the call's string result.
///
/// Gzip bodies are decompressed whenever the server says so, even if the
/// caller never sent `Accept-Encoding: gzip`; some servers compress
/// unconditionally.
pub(crate) fn decode_body(headers: &HeaderMap, raw: Bytes, decompress: bool) -> Result<String> {
    let data = if decompress && is_gzip(headers) {
        let mut decoder = GzDecoder::new(raw.as_ref());
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::Decode(format!("gzip: {e}")))?;
        out
    } else {
        raw.to_vec()
    };
    String::from_utf8(data).map_err(|e| Error::Decode(format!("utf-8: {e}")))
}

/// Formats response `Set-Cookie` headers as `name=value|name=value` for the
/// success log event. Attributes after the first `;` are dropped.
pub(crate) fn format_set_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .collect::<Vec<_>>()
        .join("|")
}
