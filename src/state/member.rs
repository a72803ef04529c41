use serde::Deserialize;

/// The platform member acting in an interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Member {
    pub user_id: String,
    /// Display name, if the platform sent one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Holds the platform's administrator permission.
    #[serde(default)]
    pub administrator: bool,
}

impl Member {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_administrator(mut self) -> Self {
        self.administrator = true;
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Administrators and holders of an allow-listed role may moderate.
    pub fn can_moderate(&self, allowed_roles: &[String]) -> bool {
        self.administrator || allowed_roles.iter().any(|role| self.has_role(role))
    }
}
