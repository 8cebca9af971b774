//! Platform detection and normalization.
//!
//! Maps what the host reports into the tokens the artifact server expects in
//! its `os` and `os_arch` query parameters:
//! - OS: `macos`, `linux`, `alpine` (musl-based Linux), `windows`
//! - Arch: `arm64`, `x64`

use std::fmt;

use crate::{Error, Result};

/// File inspected to tell musl-based Alpine apart from other Linux systems.
const OS_RELEASE: &str = "/etc/os-release";

/// Operating system token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// macOS.
    Macos,
    /// glibc-based Linux.
    Linux,
    /// Alpine Linux (musl libc).
    Alpine,
    /// Windows.
    Windows,
}

impl Os {
    /// Resolve the OS token from the host OS family and `/etc/os-release` contents.
    pub fn resolve(family: &str, os_release: Option<&str>) -> Result<Self> {
        match family {
            "macos" => Ok(Self::Macos),
            "linux" => {
                if os_release.is_some_and(|contents| contents.contains("ID=alpine")) {
                    Ok(Self::Alpine)
                } else {
                    Ok(Self::Linux)
                }
            }
            "windows" => Ok(Self::Windows),
            other => Err(Error::UnsupportedPlatform {
                os: other.to_string(),
            }),
        }
    }

    /// Token used in the download query string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Alpine => "alpine",
            Self::Windows => "windows",
        }
    }

    /// Whether the platform has POSIX permission bits.
    #[must_use]
    pub const fn is_posix(self) -> bool {
        !matches!(self, Self::Windows)
    }

    /// Name of the CLI executable on this OS.
    #[must_use]
    pub const fn executable_name(self) -> &'static str {
        match self {
            Self::Windows => "browserstack-cli.exe",
            _ => "browserstack-cli",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit ARM.
    Arm64,
    /// 64-bit x86.
    X64,
}

impl Arch {
    /// Map a raw hardware identifier (`uname -m`, `PROCESSOR_ARCHITECTURE`).
    pub fn from_machine(machine: &str) -> Result<Self> {
        match machine.trim().to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" => Ok(Self::X64),
            _ => Err(Error::UnsupportedArchitecture {
                machine: machine.to_string(),
            }),
        }
    }

    /// Token used in the download query string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X64 => "x64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized platform specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system.
    pub os: Os,
    /// Architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a new platform.
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Name of the CLI executable on this platform.
    #[must_use]
    pub const fn executable_name(&self) -> &'static str {
        self.os.executable_name()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Raw platform queries answered by the host.
pub trait HostQuery {
    /// OS family, in `std::env::consts::OS` spelling.
    fn os_family(&self) -> String;

    /// Raw hardware identifier.
    fn machine(&self) -> Result<String>;

    /// Contents of the distribution release file, if any.
    fn os_release(&self) -> Option<String>;
}

/// [`HostQuery`] backed by the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemQuery;

impl HostQuery for SystemQuery {
    fn os_family(&self) -> String {
        std::env::consts::OS.to_string()
    }

    #[cfg(unix)]
    #[allow(unsafe_code)]
    fn machine(&self) -> Result<String> {
        // SAFETY: utsname is plain old data, so an all-zero value is valid.
        let mut info: libc::utsname = unsafe { std::mem::zeroed() };
        // SAFETY: `info` is a valid, writable utsname.
        if unsafe { libc::uname(&raw mut info) } != 0 {
            return Err(Error::io_no_path(std::io::Error::last_os_error(), "uname"));
        }
        // SAFETY: uname NUL-terminates every field it fills.
        let machine = unsafe { std::ffi::CStr::from_ptr(info.machine.as_ptr()) };
        Ok(machine
            .to_string_lossy()
            .trim_matches(|c: char| c.is_whitespace() || c.is_control())
            .to_string())
    }

    #[cfg(not(unix))]
    fn machine(&self) -> Result<String> {
        std::env::var("PROCESSOR_ARCHITECTURE")
            .map(|arch| arch.to_lowercase())
            .map_err(|_| Error::UnsupportedArchitecture {
                machine: "<unknown>".to_string(),
            })
    }

    fn os_release(&self) -> Option<String> {
        if cfg!(target_os = "linux") {
            std::fs::read_to_string(OS_RELEASE).ok()
        } else {
            None
        }
    }
}

/// Detect the platform through the given host query.
pub fn detect(host: &impl HostQuery) -> Result<Platform> {
    let os = Os::resolve(&host.os_family(), host.os_release().as_deref())?;
    let arch = Arch::from_machine(&host.machine()?)?;
    Ok(Platform::new(os, arch))
}

/// Get the current platform.
pub fn current_platform() -> Result<Platform> {
    detect(&SystemQuery)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost {
        family: &'static str,
        machine: &'static str,
        release: Option<&'static str>,
    }

    impl HostQuery for FakeHost {
        fn os_family(&self) -> String {
            self.family.to_string()
        }

        fn machine(&self) -> Result<String> {
            Ok(self.machine.to_string())
        }

        fn os_release(&self) -> Option<String> {
            self.release.map(String::from)
        }
    }

    fn host(family: &'static str, machine: &'static str) -> FakeHost {
        FakeHost {
            family,
            machine,
            release: None,
        }
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!(Arch::from_machine("arm64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_machine("aarch64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_machine("x86_64").unwrap(), Arch::X64);
        assert_eq!(Arch::from_machine("AMD64").unwrap(), Arch::X64);
        assert_eq!(Arch::from_machine(" x86_64\n").unwrap(), Arch::X64);
    }

    #[test]
    fn test_arch_unknown() {
        for machine in ["riscv64", "i686", "armv7l", ""] {
            assert!(matches!(
                Arch::from_machine(machine),
                Err(Error::UnsupportedArchitecture { .. })
            ));
        }
    }

    #[test]
    fn test_os_tokens() {
        assert_eq!(Os::resolve("macos", None).unwrap().as_str(), "macos");
        assert_eq!(Os::resolve("linux", None).unwrap().as_str(), "linux");
        assert_eq!(Os::resolve("windows", None).unwrap().as_str(), "windows");
    }

    #[test]
    fn test_os_alpine_detection() {
        let release = "NAME=\"Alpine Linux\"\nID=alpine\nVERSION_ID=3.19.1\n";
        assert_eq!(Os::resolve("linux", Some(release)).unwrap(), Os::Alpine);

        let release = "NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\n";
        assert_eq!(Os::resolve("linux", Some(release)).unwrap(), Os::Linux);
    }

    #[test]
    fn test_os_release_ignored_off_linux() {
        assert_eq!(Os::resolve("macos", Some("ID=alpine")).unwrap(), Os::Macos);
    }

    #[test]
    fn test_os_unsupported() {
        assert!(matches!(
            Os::resolve("freebsd", None),
            Err(Error::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_detect_with_fake_host() {
        let platform = detect(&host("macos", "arm64")).unwrap();
        assert_eq!(platform, Platform::new(Os::Macos, Arch::Arm64));
        assert_eq!(platform.to_string(), "macos-arm64");

        let alpine = FakeHost {
            family: "linux",
            machine: "x86_64",
            release: Some("ID=alpine\n"),
        };
        assert_eq!(detect(&alpine).unwrap().to_string(), "alpine-x64");
    }

    #[test]
    fn test_detect_unknown_machine() {
        let err = detect(&host("linux", "mips")).unwrap_err();
        assert!(err.to_string().contains("mips"));
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(Os::Windows.executable_name(), "browserstack-cli.exe");
        assert_eq!(Os::Linux.executable_name(), "browserstack-cli");
        assert_eq!(
            Platform::new(Os::Macos, Arch::X64).executable_name(),
            "browserstack-cli"
        );
    }

    #[test]
    fn test_current_platform() {
        // Only meaningful on the hosts the launcher ships for.
        if let Ok(p) = current_platform() {
            assert!(!p.os.as_str().is_empty());
            assert!(!p.arch.as_str().is_empty());
        }
    }
}
