use serde::{Deserialize, Serialize};

use crate::domain::{Vendor, WorkScopeLevel};

pub const DEFAULT_ADVERTISING_TAG: &str = "REKLAM";
pub const DEFAULT_SPECIAL_VENDORS: [&str; 3] = ["BARAN", "MOTOR", "ETKIN"];

/// Which expenses must carry supporting paperwork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationPolicy {
    pub advertising_tag: String,
    /// Upper-case substrings matched against the vendor display name.
    pub special_vendors: Vec<String>,
}

impl Default for DocumentationPolicy {
    fn default() -> Self {
        Self {
            advertising_tag: DEFAULT_ADVERTISING_TAG.into(),
            special_vendors: DEFAULT_SPECIAL_VENDORS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationRequirement {
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DocumentationRequirement {
    fn required(reason: impl Into<String>) -> Self {
        Self {
            required: true,
            reason: Some(reason.into()),
        }
    }
}

impl DocumentationPolicy {
    /// First matching rule wins.
    pub fn check(
        &self,
        work_scope_level: WorkScopeLevel,
        primary_tag: &str,
        vendor_name: &str,
        vendor: Option<&Vendor>,
    ) -> DocumentationRequirement {
        if work_scope_level == WorkScopeLevel::NonImalat {
            return DocumentationRequirement::required(
                "NON_IMALAT expenses require documentation",
            );
        }

        if primary_tag.trim() == self.advertising_tag {
            return DocumentationRequirement::required(
                "Advertising expenses require documentation",
            );
        }

        let display_name = vendor
            .map(|v| v.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(vendor_name)
            .to_uppercase();
        if !display_name.is_empty()
            && self
                .special_vendors
                .iter()
                .any(|special| display_name.contains(&special.to_uppercase()))
        {
            return DocumentationRequirement::required(format!(
                "Vendor {} requires mandatory documentation",
                display_name
            ));
        }

        if vendor.is_some_and(|v| v.requires_documentation) {
            return DocumentationRequirement::required("Vendor requires documentation");
        }

        DocumentationRequirement::default()
    }
}

/// Checks with the default policy.
pub fn requires_documentation(
    work_scope_level: WorkScopeLevel,
    primary_tag: &str,
    vendor_name: &str,
    vendor: Option<&Vendor>,
) -> DocumentationRequirement {
    DocumentationPolicy::default().check(work_scope_level, primary_tag, vendor_name, vendor)
}
