//! Boot volume layout: bootloader menu, device naming, and shell quoting
//! for the commands issued on the build host.

/// Path of the compressed kernel inside the boot volume.
pub const KERNEL_PATH: &str = "/boot/mirage-os.gz";

/// Directory holding the bootloader menu, relative to the mount point.
pub const GRUB_DIR: &str = "boot/grub";

/// Minimal GRUB legacy menu that boots the unikernel with no operator
/// interaction.
#[must_use]
pub fn grub_menu() -> String {
    format!("default 0\ntimeout 1\ntitle Mirage\nroot (hd0)\nkernel {KERNEL_PATH}\n")
}

/// Names under which the guest may expose a device attached as `requested`.
///
/// Xen guests rename `/dev/sdX` to `/dev/xvdX`; the requested name comes
/// first.
#[must_use]
pub fn device_aliases(requested: &str) -> Vec<String> {
    let mut names = vec![requested.to_string()];
    if let Some(suffix) = requested.strip_prefix("/dev/sd") {
        names.push(format!("/dev/xvd{suffix}"));
    }
    names
}

/// Quote a string for a POSIX shell.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Remote file name the artifact is uploaded to before compression.
#[must_use]
pub fn remote_upload_path(file_name: &str) -> String {
    format!("/tmp/{file_name}")
}
