/// The invoking user as `uid:gid`, used so files created in the workspace mount
/// stay owned by the host user.
#[allow(unsafe_code)]
pub fn current_user_spec() -> String {
    // SAFETY: getuid()/getgid() cannot fail and have no side effects.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    format!("{uid}:{gid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_spec_is_numeric_pair() {
        let spec = current_user_spec();
        let (uid, gid) = spec.split_once(':').unwrap();
        assert!(uid.parse::<u32>().is_ok());
        assert!(gid.parse::<u32>().is_ok());
    }
}
