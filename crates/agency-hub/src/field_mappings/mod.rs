//! Cross-vendor field name mappings, edited by hand from the admin UI.

pub mod repository;
pub mod router;

use serde::{Deserialize, Serialize};

pub use repository::{
    FieldMappingRepository, InMemoryFieldMappingRepository, SqliteFieldMappingRepository,
};
pub use router::field_mapping_router;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    pub id: i64,
    pub field_name: Option<String>,
    pub acquaint_crm: Option<String>,
    pub propertydrive: Option<String>,
    pub daft: Option<String>,
    pub myhome: Option<String>,
}

/// Body of create and update requests. Update replaces every column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldMappingInput {
    pub field_name: Option<String>,
    pub acquaint_crm: Option<String>,
    pub propertydrive: Option<String>,
    pub daft: Option<String>,
    pub myhome: Option<String>,
}

impl FieldMappingInput {
    fn into_mapping(self, id: i64) -> FieldMapping {
        FieldMapping {
            id,
            field_name: self.field_name,
            acquaint_crm: self.acquaint_crm,
            propertydrive: self.propertydrive,
            daft: self.daft,
            myhome: self.myhome,
        }
    }
}
