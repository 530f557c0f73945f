//! RoamWiFi request signing
//!
//! Keys sorted ascending, `key=value` pairs concatenated with no separator,
//! shared secret appended, MD5, lowercase hex. Any deviation and the partner
//! rejects the call.

use std::collections::BTreeMap;

use crate::util::md5_hex;

pub const SIGN_PARAM: &str = "sign";

pub fn sign(params: &BTreeMap<String, String>, key: &str) -> String {
    let mut buf = String::new();
    for (k, v) in params.iter().filter(|(k, _)| k.as_str() != SIGN_PARAM) {
        buf.push_str(k);
        buf.push('=');
        buf.push_str(v);
    }
    buf.push_str(key);
    md5_hex(&buf)
}

/// Drop empty values, then add the `sign` parameter
pub fn signed(mut params: BTreeMap<String, String>, key: &str) -> BTreeMap<String, String> {
    params.retain(|_, v| !v.is_empty());
    let signature = sign(&params, key);
    params.insert(SIGN_PARAM.to_string(), signature);
    params
}
