//! System-package requirement reporting.
//!
//! epibuild never installs system packages itself; it reports the install
//! commands for the requirements declared across the workspace.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

use crate::core::spec::Requirements;
use crate::util::process::find_executable;

/// Supported system package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Yum,
    Apt,
    Conda,
}

impl PackageManager {
    /// All known managers, in detection order.
    pub const ALL: &'static [PackageManager] =
        &[PackageManager::Apt, PackageManager::Yum, PackageManager::Conda];

    /// Guess the host's package manager from the executables on the PATH.
    pub fn guess() -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|manager| find_executable(manager.program()).is_some())
    }

    /// The executable used to install packages.
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt-get",
            PackageManager::Conda => "conda",
        }
    }

    /// The requirement list this manager covers.
    pub fn packages<'a>(&self, requirements: &'a Requirements) -> &'a [String] {
        match self {
            PackageManager::Yum => &requirements.yum,
            PackageManager::Apt => &requirements.apt,
            PackageManager::Conda => &requirements.conda,
        }
    }

    /// The install command for this manager's requirement list, if any.
    pub fn install_command(&self, requirements: &Requirements) -> Option<String> {
        let packages = self.packages(requirements);
        if packages.is_empty() {
            return None;
        }
        let mut command = match self {
            PackageManager::Yum => vec!["yum", "install", "-y"],
            PackageManager::Apt => vec!["apt-get", "install", "-y"],
            PackageManager::Conda => vec!["conda", "install", "-y"],
        };
        command.extend(packages.iter().map(String::as_str));
        Some(command.join(" "))
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Yum => "yum",
            PackageManager::Apt => "apt",
            PackageManager::Conda => "conda",
        };
        f.write_str(name)
    }
}

impl FromStr for PackageManager {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yum" => Ok(PackageManager::Yum),
            "apt" | "apt-get" => Ok(PackageManager::Apt),
            "conda" => Ok(PackageManager::Conda),
            other => bail!("unknown package manager `{other}` (expected yum, apt, or conda)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requirements() -> Requirements {
        Requirements {
            yum: vec!["re2c".into()],
            apt: vec!["re2c".into(), "libreadline-dev".into()],
            conda: vec![],
        }
    }

    #[test]
    fn test_install_command() {
        let reqs = requirements();

        assert_eq!(
            PackageManager::Apt.install_command(&reqs).unwrap(),
            "apt-get install -y re2c libreadline-dev"
        );
        assert_eq!(
            PackageManager::Yum.install_command(&reqs).unwrap(),
            "yum install -y re2c"
        );
        assert!(PackageManager::Conda.install_command(&reqs).is_none());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("apt".parse::<PackageManager>().unwrap(), PackageManager::Apt);
        assert_eq!("APT-GET".parse::<PackageManager>().unwrap(), PackageManager::Apt);
        assert_eq!("yum".parse::<PackageManager>().unwrap(), PackageManager::Yum);
        assert!("brew".parse::<PackageManager>().is_err());
    }
}
