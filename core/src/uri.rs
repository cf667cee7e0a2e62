//! Shareable `ss://` connection URIs

use crate::model::ConfigRecord;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

/// Scheme tag prefixed to every URI
pub const URI_SCHEME: &str = "ss://";

/// Plain-text user info encoded into the URI: `method:password@address:port`
pub fn user_info(record: &ConfigRecord, address: &str) -> String {
    format!(
        "{}:{}@{}:{}",
        record.method, record.password, address, record.server_port
    )
}

/// `ss://` followed by the unpadded base64 of [`user_info`]
pub fn format_uri(record: &ConfigRecord, address: &str) -> String {
    format!(
        "{}{}",
        URI_SCHEME,
        STANDARD_NO_PAD.encode(user_info(record, address))
    )
}
