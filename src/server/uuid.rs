use md5::{Digest, Md5};
use uuid::Uuid;

/// Derives a stable UUID from a username the same way the vanilla server
/// does in offline mode: MD5 of `"OfflinePlayer:" + name` with the version
/// and variant bits forced to mark it as a name-based id.
pub(crate) fn generate_offline_uuid(username: &str) -> Uuid {
    let mut bytes: [u8; 16] = Md5::digest(format!("OfflinePlayer:{username}")).into();
    bytes[6] = bytes[6] & 0x0f | 0x30;
    bytes[8] = bytes[8] & 0x3f | 0x80;
    Uuid::from_bytes(bytes)
}
