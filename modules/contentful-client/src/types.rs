use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field values keyed by locale code (e.g. `"es"`, `"en-US"`).
pub type Localized<T> = BTreeMap<String, T>;

/// System metadata attached to every Contentful resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sys {
    pub id: String,
    #[serde(rename = "type")]
    pub sys_type: String,
    pub version: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub published_version: Option<u32>,
}

/// A link to another resource, as it appears in request and response bodies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub sys: LinkSys,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkSys {
    #[serde(rename = "type")]
    pub sys_type: String,
    pub link_type: String,
    pub id: String,
}

impl Link {
    pub fn upload(id: impl Into<String>) -> Self {
        Self {
            sys: LinkSys {
                sys_type: "Link".to_string(),
                link_type: "Upload".to_string(),
                id: id.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Space {
    pub sys: Sys,
    pub name: Option<String>,
}

impl Space {
    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

/// An environment inside a space. Carries the owning space id so later calls
/// can build their paths from the environment alone.
#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    pub sys: Sys,
    pub name: Option<String>,
    #[serde(skip)]
    pub space_id: String,
}

impl Environment {
    /// A handle to a known environment, built without fetching it.
    pub fn reference(space_id: &str, environment_id: &str) -> Self {
        Self {
            sys: Sys {
                id: environment_id.to_string(),
                sys_type: "Environment".to_string(),
                version: None,
                created_at: None,
                updated_at: None,
                published_version: None,
            },
            name: None,
            space_id: space_id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.sys.id
    }
}

/// A staged binary, referenced from an asset's `uploadFrom` link.
#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    pub sys: Sys,
}

/// The `file` field of an asset for one locale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetFile {
    pub content_type: String,
    pub file_name: String,
    /// Set on creation; Contentful drops it once the file is processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_from: Option<Link>,
    /// Only present after processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetFields {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub title: Localized<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description: Localized<String>,
    #[serde(default)]
    pub file: Localized<AssetFile>,
}

impl AssetFields {
    /// Build fields with every value stored under a single locale.
    pub fn single_locale(
        locale: &str,
        title: &str,
        description: Option<&str>,
        file: AssetFile,
    ) -> Self {
        let mut fields = Self::default();
        fields.title.insert(locale.to_string(), title.to_string());
        if let Some(description) = description {
            fields
                .description
                .insert(locale.to_string(), description.to_string());
        }
        fields.file.insert(locale.to_string(), file);
        fields
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub sys: Sys,
    #[serde(default)]
    pub fields: AssetFields,
}

impl Asset {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn version(&self) -> u32 {
        self.sys.version.unwrap_or_default()
    }

    /// Locales that carry a file, in a stable order.
    pub fn file_locales(&self) -> Vec<String> {
        self.fields.file.keys().cloned().collect()
    }

    /// True once Contentful has produced a rendition URL for the locale.
    pub fn is_processed(&self, locale: &str) -> bool {
        self.fields
            .file
            .get(locale)
            .is_some_and(|file| file.url.is_some())
    }

    pub fn is_published(&self) -> bool {
        self.sys.published_version.is_some()
    }
}

/// Body of `POST /assets`.
#[derive(Debug, Serialize)]
pub(crate) struct CreateAssetRequest<'a> {
    pub fields: &'a AssetFields,
}
