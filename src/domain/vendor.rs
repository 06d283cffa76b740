use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A supplier or subcontractor expenses are paid to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub requires_documentation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Vendor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            requires_documentation: false,
            notes: None,
        }
    }

    pub fn requiring_documentation(mut self) -> Self {
        self.requires_documentation = true;
        self
    }

    /// Lowercased, trimmed name used for matching expense vendor names.
    pub fn name_key(&self) -> String {
        normalize_name(&self.name)
    }
}

impl Identifiable for Vendor {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Vendor {
    fn display_label(&self) -> String {
        if self.requires_documentation {
            format!("{} (docs required)", self.name)
        } else {
            self.name.clone()
        }
    }
}
