//! Host facts mixed into the generator's initial seed, per specification
//! §4.2 / §6. Every contribution here is best-effort except the 32 bytes of
//! OS entropy, which is required: its absence is the one fatal path in this
//! module. Everything else degrades silently and is logged, never returned
//! as an error, since the 32 OS-entropy bytes are already sufficient on
//! their own.

use std::time::{SystemTime, UNIX_EPOCH};

/// 32 bytes from the OS cryptographic RNG. Fatal if unavailable: the
/// invariant that the initial seed contains true randomness cannot be
/// established any other way.
pub fn os_entropy_32() -> [u8; 32] {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).expect("OS entropy source unavailable during initial seeding");
    buf
}

/// Current wall-clock time in nanoseconds, big-endian encoded.
pub fn now_nanos_be() -> [u8; 8] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0);
    nanos.to_be_bytes()
}

/// One host network interface's contribution to the seed buffer, in the
/// fixed field order the specification requires: MTU, name, hardware
/// address, flags.
pub struct InterfaceFact {
    pub mtu: i64,
    pub name: String,
    pub hardware_addr: Vec<u8>,
    pub flags: i64,
}

impl InterfaceFact {
    fn write_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.mtu.to_be_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&self.hardware_addr);
        buf.extend_from_slice(&self.flags.to_be_bytes());
    }
}

/// Enumerates host network interfaces for seed material. Failure to
/// enumerate (sandboxed environments, permission issues) yields an empty
/// vector and is logged at `warn`, per the "degraded operation" error
/// category.
pub fn interface_facts() -> Vec<InterfaceFact> {
    let interfaces = pnet_datalink::interfaces();
    if interfaces.is_empty() {
        tracing::warn!("no network interfaces enumerated; omitting from initial seed");
    }
    interfaces
        .into_iter()
        .map(|iface| InterfaceFact {
            mtu: interface_mtu(&iface.name),
            name: iface.name,
            hardware_addr: iface
                .mac
                .map(|mac| mac.octets().to_vec())
                .unwrap_or_default(),
            flags: iface.flags as i64,
        })
        .collect()
}

// `pnet_datalink::NetworkInterface` does not carry MTU, and probing it
// portably needs a per-platform ioctl/syscall that would dominate this
// module for a value that only ever feeds best-effort seed entropy. We
// omit it (contributing 0) rather than invent a fragile platform probe;
// per the specification this is a "degraded operation" path and the 32
// bytes of required OS entropy remain sufficient on their own.
fn interface_mtu(_name: &str) -> i64 {
    0
}

/// Current user account facts, as far as the platform exposes them.
pub struct UserAccountFacts {
    pub uid: String,
    pub gid: String,
    pub username: String,
    pub home_dir: String,
}

/// Best-effort lookup of the current user's account details. Absence is
/// logged at `warn` and the contribution is simply omitted.
#[cfg(unix)]
pub fn user_account_facts() -> Option<UserAccountFacts> {
    let uid = users::get_current_uid();
    let gid = users::get_current_gid();
    let username = users::get_current_username().and_then(|s| s.into_string().ok());
    let home_dir = dirs::home_dir().and_then(|p| p.into_os_string().into_string().ok());

    match (username, home_dir) {
        (Some(username), Some(home_dir)) => Some(UserAccountFacts {
            uid: uid.to_string(),
            gid: gid.to_string(),
            username,
            home_dir,
        }),
        _ => {
            tracing::warn!("could not resolve current user account; omitting from initial seed");
            None
        }
    }
}

#[cfg(not(unix))]
pub fn user_account_facts() -> Option<UserAccountFacts> {
    let home_dir = dirs::home_dir().and_then(|p| p.into_os_string().into_string().ok());
    match home_dir {
        Some(home_dir) => Some(UserAccountFacts {
            uid: String::new(),
            gid: String::new(),
            username: String::new(),
            home_dir,
        }),
        None => {
            tracing::warn!("could not resolve current user account; omitting from initial seed");
            None
        }
    }
}

/// Assembles the full initial-seed buffer in the specification's fixed
/// field order: OS entropy, time, interfaces, user account.
pub fn collect_initial_seed() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&os_entropy_32());
    buf.extend_from_slice(&now_nanos_be());
    for iface in interface_facts() {
        iface.write_into(&mut buf);
    }
    if let Some(user) = user_account_facts() {
        buf.extend_from_slice(user.uid.as_bytes());
        buf.extend_from_slice(user.gid.as_bytes());
        buf.extend_from_slice(user.username.as_bytes());
        buf.extend_from_slice(user.home_dir.as_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_seed_always_contains_at_least_the_os_entropy_and_time() {
        let seed = collect_initial_seed();
        assert!(seed.len() >= 32 + 8);
    }

    #[test]
    fn os_entropy_is_not_all_zero() {
        assert_ne!(os_entropy_32(), [0u8; 32]);
    }
}
