//! Ownership records: organizations own projects, projects own environments, and flags live in
//! one environment of a project.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    flags::{Flag, FlagType, Timestamp},
    Error, Result,
};

/// Environments a project gets when none are given.
pub const DEFAULT_ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Organization {
    /// Create an organization with a generated id.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Organization {
        let now = Utc::now();
        Organization {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: String,
    pub environments: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Create a project with a generated id. `environments` defaults to
    /// [`DEFAULT_ENVIRONMENTS`].
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        organization_id: impl Into<String>,
        environments: Option<Vec<String>>,
    ) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            organization_id: organization_id.into(),
            environments: environments.unwrap_or_else(|| {
                DEFAULT_ENVIRONMENTS
                    .iter()
                    .map(|env| env.to_string())
                    .collect()
            }),
            created_at: now,
            updated_at: now,
        }
    }

    #[allow(missing_docs)]
    pub fn has_environment(&self, environment: &str) -> bool {
        self.environments.iter().any(|env| env == environment)
    }

    /// Create a new flag in `environment` of this project.
    ///
    /// Fails with [`Error::UnknownEnvironment`] if the project has no such environment.
    pub fn new_flag(
        &self,
        environment: &str,
        key: impl Into<String>,
        name: impl Into<String>,
        flag_type: FlagType,
        created_by: impl Into<String>,
    ) -> Result<Flag> {
        if !self.has_environment(environment) {
            return Err(Error::UnknownEnvironment {
                environment: environment.to_owned(),
                project: self.id.clone(),
            });
        }
        Ok(Flag::new(
            key,
            name,
            flag_type,
            self.id.clone(),
            environment,
            created_by,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        flags::{DefaultState, FlagStatus, FlagType},
        Error,
    };

    use super::{Organization, Project};

    #[test]
    fn default_environments() {
        let org = Organization::new("Acme", "");
        let project = Project::new("Web", "storefront", &org.id, None);
        assert_eq!(project.organization_id, org.id);
        assert_eq!(
            project.environments,
            vec!["development", "staging", "production"]
        );
        assert!(project.has_environment("staging"));
        assert!(!project.has_environment("qa"));
    }

    #[test]
    fn explicit_environments() {
        let project = Project::new("Web", "", "org", Some(vec!["qa".to_owned()]));
        assert!(project.has_environment("qa"));
        assert!(!project.has_environment("production"));
    }

    #[test]
    fn new_flag() {
        let project = Project::new("Web", "", "org", None);
        let flag = project
            .new_flag("production", "checkout", "Checkout", FlagType::Boolean, "alice")
            .unwrap();
        assert_eq!(flag.project_id, project.id);
        assert_eq!(flag.environment, "production");
        assert_eq!(flag.status, FlagStatus::Active);
        assert_eq!(flag.default_state, DefaultState::Off);
        assert_eq!(flag.created_by, "alice");
        assert_eq!(flag.created_at, flag.updated_at);
    }

    #[test]
    fn new_flag_in_unknown_environment() {
        let project = Project::new("Web", "", "org", None);
        let err = project
            .new_flag("qa", "checkout", "Checkout", FlagType::Boolean, "alice")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownEnvironment { environment, .. } if environment == "qa"
        ));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Organization::new("a", "").id, Organization::new("a", "").id);
    }
}
