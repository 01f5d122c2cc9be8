//! System-package requirement reporting.

use crate::core::specs::Specifications;
use crate::syspkg::PackageManager;

/// The install commands for the workspace's merged requirements.
///
/// With an explicit manager, only its command is returned (possibly none);
/// otherwise every manager with declared packages contributes one.
pub fn install_commands(
    specs: &Specifications,
    manager: Option<PackageManager>,
) -> Vec<String> {
    let managers: Vec<PackageManager> = match manager {
        Some(manager) => vec![manager],
        None => PackageManager::ALL.to_vec(),
    };

    managers
        .iter()
        .filter_map(|manager| manager.install_command(&specs.requirements))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::Requirements;
    use crate::test_support::workspace_under;

    fn specs_with_requirements(tmp: &std::path::Path) -> Specifications {
        let mut specs = workspace_under(tmp);
        specs.requirements = Requirements {
            apt: vec!["re2c".into()],
            yum: vec!["re2c".into(), "readline-devel".into()],
            conda: vec![],
        };
        specs
    }

    #[test]
    fn test_all_managers_with_packages_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let specs = specs_with_requirements(tmp.path());

        let commands = install_commands(&specs, None);
        assert_eq!(
            commands,
            vec![
                "apt-get install -y re2c",
                "yum install -y re2c readline-devel"
            ]
        );
    }

    #[test]
    fn test_explicit_manager_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let specs = specs_with_requirements(tmp.path());

        let commands = install_commands(&specs, Some(PackageManager::Yum));
        assert_eq!(commands, vec!["yum install -y re2c readline-devel"]);

        assert!(install_commands(&specs, Some(PackageManager::Conda)).is_empty());
    }
}
