use crate::core::certificate::{
    CertificateNumbering, CertificateSeries, NumberingStrategy, DEFAULT_SEQUENCE_RPC,
    MAX_CERTIFICATE_BASE,
};
use crate::core::{ColorToken, ConfigProvider, Engineer, EquipmentKind};
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::{
    validate_certificate_prefix, validate_email, validate_non_empty_string,
    validate_positive_number, validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAX_INSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub certificates: CertificatesConfig,
    #[serde(default)]
    pub engineers: Vec<Engineer>,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificatesConfig {
    #[serde(default)]
    pub strategy: NumberingStrategy,
    pub sequence_rpc: Option<String>,
    pub max_insert_attempts: Option<usize>,
    /// Per-kind prefix and base, keyed by kind name (`loler`, `rivet_tool`, ...).
    #[serde(default)]
    pub kinds: BTreeMap<String, CertificateSeries>,
}

/// Display colour for each status token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub valid: String,
    pub upcoming: String,
    pub expired: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            valid: "#16a34a".to_string(),
            upcoming: "#f59e0b".to_string(),
            expired: "#dc2626".to_string(),
        }
    }
}

impl ThemeConfig {
    pub fn color_for(&self, token: ColorToken) -> &str {
        match token {
            ColorToken::Green => &self.valid,
            ColorToken::Amber => &self.upcoming,
            ColorToken::Red => &self.expired,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub emails: Vec<String>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ComplianceError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ComplianceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written so validation can point at them.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| ComplianceError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn numbering(&self) -> Result<CertificateNumbering> {
        let mut series = BTreeMap::new();
        for (name, entry) in &self.certificates.kinds {
            let kind: EquipmentKind =
                name.parse()
                    .map_err(|reason: String| ComplianceError::InvalidConfigValueError {
                        field: "certificates.kinds".to_string(),
                        value: name.clone(),
                        reason,
                    })?;
            series.insert(kind, entry.clone());
        }

        Ok(CertificateNumbering::new(
            self.certificates.strategy,
            self.certificates
                .sequence_rpc
                .as_deref()
                .unwrap_or(DEFAULT_SEQUENCE_RPC),
            series,
        ))
    }

    pub fn max_insert_attempts(&self) -> usize {
        self.certificates
            .max_insert_attempts
            .unwrap_or(DEFAULT_MAX_INSERT_ATTEMPTS)
    }

    pub fn engineer(&self, name: &str) -> Option<&Engineer> {
        self.engineers
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
    }

    /// An empty allowlist means every signed-in user may edit.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin.emails.is_empty()
            || self
                .admin
                .emails
                .iter()
                .any(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("backend.url", &self.backend.url)?;

        let api_key = validate_required_field("backend.api_key", &self.backend.api_key)?;
        if api_key.starts_with("${") {
            return Err(ComplianceError::InvalidConfigValueError {
                field: "backend.api_key".to_string(),
                value: api_key.clone(),
                reason: "environment variable is not set".to_string(),
            });
        }
        validate_non_empty_string("backend.api_key", api_key)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            validate_range("backend.timeout_seconds", timeout, 1, 300)?;
        }

        if let Some(attempts) = self.certificates.max_insert_attempts {
            validate_positive_number("certificates.max_insert_attempts", attempts, 1)?;
        }
        if let Some(rpc) = &self.certificates.sequence_rpc {
            validate_non_empty_string("certificates.sequence_rpc", rpc)?;
        }

        let numbering = self.numbering()?;
        for kind in EquipmentKind::ALL {
            let series = numbering.series(kind);
            validate_certificate_prefix(&format!("certificates.kinds.{}.prefix", kind), &series.prefix)?;
            validate_range(
                &format!("certificates.kinds.{}.base", kind),
                series.base,
                0,
                MAX_CERTIFICATE_BASE,
            )?;
        }

        for engineer in &self.engineers {
            validate_non_empty_string("engineers.name", &engineer.name)?;
        }
        for email in &self.admin.emails {
            validate_email("admin.emails", email)?;
        }

        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn backend_url(&self) -> &str {
        &self.backend.url
    }

    fn api_key(&self) -> &str {
        self.backend.api_key.as_deref().unwrap_or_default()
    }

    fn timeout_seconds(&self) -> u64 {
        self.backend
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
