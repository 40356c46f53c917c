//! Software components under git control on an ABAP system.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AdkError, Result};

/// A software component / repository as configured in the add-on
/// descriptor and enriched during the delivery process.
///
/// `version_yaml` holds the dotted version string from the manifest;
/// `version`, `sp_level` and `patch_level` are filled once the version has
/// been resolved against AAKaaS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default, rename = "commitID")]
    pub commit_id: String,
    #[serde(default, rename = "version")]
    pub version_yaml: String,
    #[serde(default, rename = "versionAAK")]
    pub version: String,
    #[serde(default, rename = "spLevel")]
    pub sp_level: String,
    #[serde(default, rename = "patchLevel")]
    pub patch_level: String,
    #[serde(default, rename = "packageName")]
    pub package_name: String,
    #[serde(default, rename = "packageType")]
    pub package_type: String,
    #[serde(default, rename = "predecessorCommitID")]
    pub predecessor_commit_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "useClassicCTS")]
    pub use_classic_cts: bool,
    #[serde(default, rename = "inBuildScope")]
    pub in_build_scope: bool,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default, rename = "additionalPiecelist")]
    pub additional_piecelist: String,
    #[serde(default, rename = "byogAuthMethod")]
    pub byog_auth_method: String,
    #[serde(default, rename = "byogUsername")]
    pub byog_username: String,
    #[serde(default, rename = "byogPassword")]
    pub byog_password: String,
    #[serde(skip)]
    pub is_byog: bool,
}

#[derive(Serialize)]
struct CloneBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    sc_name: Option<&'a str>,
    branch_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_method: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
struct PullBody<'a> {
    commit_id: &'a str,
    tag_name: &'a str,
}

impl Repository {
    pub fn new(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { name: name.into(), branch: branch.into(), ..Self::default() }
    }

    /// Languages rendered for the build framework, e.g. `ISO-DEEN`.
    ///
    /// An empty list falls back to the default languages DE and EN.
    pub fn iso_languages(&self) -> String {
        if self.languages.is_empty() {
            return "ISO-DEEN".to_string();
        }
        let mut rendered = String::from("ISO-");
        for language in &self.languages {
            rendered.push_str(&language.to_uppercase());
        }
        rendered
    }

    fn note_commit_precedence(&self) {
        if !self.commit_id.is_empty() && !self.tag.is_empty() {
            info!(tag = %self.tag, commit_id = %self.commit_id, "The commit ID takes precedence over the tag");
        }
    }

    /// Request body for the clone action.
    ///
    /// The commit ID selects the revision; a tag is recorded alongside it
    /// but the commit ID takes precedence when both are set. With
    /// bring-your-own-git credentials present, they are embedded into the
    /// body as the backend expects.
    ///
    /// `with_sc_name` controls whether the component name is part of the
    /// body (collection-style endpoints) or of the URL (bound actions).
    pub fn clone_body(&self, with_sc_name: bool) -> Result<String> {
        self.note_commit_precedence();
        let body = CloneBody {
            sc_name: with_sc_name.then_some(self.name.as_str()),
            branch_name: &self.branch,
            commit_id: (!self.commit_id.is_empty()).then_some(self.commit_id.as_str()),
            tag_name: (!self.tag.is_empty()).then_some(self.tag.as_str()),
            auth_method: self.is_byog.then_some(self.byog_auth_method.as_str()),
            username: self.is_byog.then_some(self.byog_username.as_str()),
            password: self.is_byog.then_some(self.byog_password.as_str()),
        };
        serde_json::to_string(&body).map_err(|err| AdkError::Parse(err.to_string()))
    }

    /// Request body for the pull action; empty strings are valid values.
    pub fn pull_body(&self) -> Result<String> {
        self.note_commit_precedence();
        let body = PullBody { commit_id: &self.commit_id, tag_name: &self.tag };
        serde_json::to_string(&body).map_err(|err| AdkError::Parse(err.to_string()))
    }

    /// Human-readable identification for log lines, e.g.
    /// `repository / software component 'NAME', branch 'main', commit 'abc'`.
    pub fn describe(&self) -> String {
        let mut description =
            format!("repository / software component '{}'", self.name);
        if !self.branch.is_empty() {
            description.push_str(&format!(", branch '{}'", self.branch));
        }
        if !self.commit_id.is_empty() {
            description.push_str(&format!(", commit '{}'", self.commit_id));
        } else if !self.tag.is_empty() {
            description.push_str(&format!(", tag '{}'", self.tag));
        }
        description
    }

    /// Attach bring-your-own-git credentials for the next clone.
    pub fn set_byog_credentials(
        &mut self,
        auth_method: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.byog_auth_method = auth_method.into();
        self.byog_username = username.into();
        self.byog_password = password.into();
        self.is_byog = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(branch: &str, commit: &str, tag: &str) -> Repository {
        Repository {
            name: "/DMO/REPO".to_string(),
            branch: branch.to_string(),
            commit_id: commit.to_string(),
            tag: tag.to_string(),
            ..Repository::default()
        }
    }

    #[test]
    fn clone_body_with_commit_and_tag_keeps_both() {
        let body = repo("main", "abc", "v1").clone_body(false).unwrap();
        assert_eq!(body, r#"{"branch_name":"main","commit_id":"abc","tag_name":"v1"}"#);
    }

    #[test]
    fn clone_body_with_commit_only() {
        let body = repo("main", "abc", "").clone_body(false).unwrap();
        assert_eq!(body, r#"{"branch_name":"main","commit_id":"abc"}"#);
    }

    #[test]
    fn clone_body_with_tag_only() {
        let body = repo("main", "", "v1").clone_body(false).unwrap();
        assert_eq!(body, r#"{"branch_name":"main","tag_name":"v1"}"#);
    }

    #[test]
    fn clone_body_with_branch_only() {
        let body = repo("main", "", "").clone_body(false).unwrap();
        assert_eq!(body, r#"{"branch_name":"main"}"#);
    }

    #[test]
    fn clone_body_can_carry_the_component_name() {
        let body = repo("main", "", "").clone_body(true).unwrap();
        assert_eq!(body, r#"{"sc_name":"/DMO/REPO","branch_name":"main"}"#);
    }

    #[test]
    fn clone_body_includes_byog_credentials() {
        let mut repository = repo("main", "", "");
        repository.set_byog_credentials("token", "user", "secret");
        let body = repository.clone_body(false).unwrap();
        assert_eq!(
            body,
            r#"{"branch_name":"main","auth_method":"token","username":"user","password":"secret"}"#
        );
    }

    #[test]
    fn pull_body_always_contains_both_fields() {
        let body = repo("main", "", "").pull_body().unwrap();
        assert_eq!(body, r#"{"commit_id":"","tag_name":""}"#);

        let body = repo("main", "abc", "v1").pull_body().unwrap();
        assert_eq!(body, r#"{"commit_id":"abc","tag_name":"v1"}"#);
    }

    #[test]
    fn describe_prefers_the_commit_over_the_tag() {
        assert_eq!(
            repo("main", "abc", "v1").describe(),
            "repository / software component '/DMO/REPO', branch 'main', commit 'abc'"
        );
        assert_eq!(
            repo("main", "", "v1").describe(),
            "repository / software component '/DMO/REPO', branch 'main', tag 'v1'"
        );
    }

    #[test]
    fn default_languages_render_as_de_en() {
        assert_eq!(repo("main", "", "").iso_languages(), "ISO-DEEN");

        let mut repository = repo("main", "", "");
        repository.languages = vec!["fr".to_string(), "es".to_string()];
        assert_eq!(repository.iso_languages(), "ISO-FRES");
    }
}
