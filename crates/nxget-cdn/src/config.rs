//! Immutable endpoint configuration.

/// The title that owns the system-update meta container. Its requests take
/// the `s` (respectively `c`) path variant instead of `a`.
pub const SYSTEM_UPDATE_TITLE: &str = "0100000000000816";

const ATUMN_URL: &str = "https://atumn.hac.lp1.d4c.nintendo.net";
const ATUMN_URL_CN: &str = "https://atumn.hac.lp1.d4c.n.nintendoswitch.cn";
const SUN_URL: &str = "https://sun.hac.lp1.d4c.nintendo.net/v1";
const SUN_URL_CN: &str = "https://sun.hac.lp1.d4c.n.nintendoswitch.cn/v1";

/// Settings the protocol client is built from. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CdnConfig {
    pub firmware_version: String,
    pub platform: String,
    pub device_id: String,
    pub env: String,
    /// Use the regional (Tencent) server cluster.
    pub tencent: bool,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            firmware_version: "5.1.0-3".into(),
            platform: "NX".into(),
            device_id: "DEADCAFEBABEBEEF".into(),
            env: "lp1".into(),
            tencent: false,
        }
    }
}

impl CdnConfig {
    pub fn user_agent(&self) -> String {
        format!(
            "NintendoSDK Firmware/{} (platform:{}; did:{}; eid:{})",
            self.firmware_version, self.platform, self.device_id, self.env
        )
    }

    pub fn atumn_url(&self) -> &'static str {
        if self.tencent { ATUMN_URL_CN } else { ATUMN_URL }
    }

    pub fn sun_url(&self) -> &'static str {
        if self.tencent { SUN_URL_CN } else { SUN_URL }
    }

    pub fn version_index_url(&self) -> String {
        format!("{}/system_update_meta?device_id={}", self.sun_url(), self.device_id)
    }

    pub fn update_meta_url(&self, title_id: &str, version: &str) -> String {
        format!(
            "{}/t/{}/{}/{}?device_id={}",
            self.atumn_url(),
            meta_variant(title_id),
            title_id,
            version,
            self.device_id
        )
    }

    pub fn content_url(&self, content_id: &str) -> String {
        format!("{}/c/c/{}", self.atumn_url(), content_id)
    }

    pub fn content_meta_url(&self, title_id: &str, content_id: &str) -> String {
        format!(
            "{}/c/{}/{}?device_id={}",
            self.atumn_url(),
            content_meta_variant(title_id),
            content_id,
            self.device_id
        )
    }
}

fn meta_variant(title_id: &str) -> &'static str {
    if title_id == SYSTEM_UPDATE_TITLE { "s" } else { "a" }
}

fn content_meta_variant(title_id: &str) -> &'static str {
    if title_id == SYSTEM_UPDATE_TITLE { "c" } else { "a" }
}
