//! Object kind collection
//!
//! Every map source refers to the same object kind enumeration, so all kind
//! tags are gathered from every map before anything is emitted.

use indexmap::IndexMap;
use std::collections::HashMap;
use tmx2c_core::Map;
use tracing::debug;

use crate::{object_type_identifier, CodegenError, OBJECT_TYPE_NONE};

/// Distinct object kind tags and their enum members, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTypes {
    members: IndexMap<String, String>,
}

impl ObjectTypes {
    /// Gather the kind tags of every object and polygon across `maps`
    ///
    /// Groups nested in tileset tiles count too. Fails when two distinct
    /// tags map to the same member, or a tag maps to the sentinel.
    pub fn collect<'a>(maps: impl IntoIterator<Item = &'a Map>) -> Result<Self, CodegenError> {
        let mut members: IndexMap<String, String> = IndexMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        for map in maps {
            for tag in map.all_object_groups().flat_map(|g| g.object_types()) {
                if members.contains_key(tag) {
                    continue;
                }

                let identifier = object_type_identifier(Some(tag));
                if identifier == OBJECT_TYPE_NONE {
                    return Err(CodegenError::ObjectTypeCollision {
                        first: "<none>".to_string(),
                        second: tag.to_string(),
                        identifier,
                    });
                }
                if let Some(first) = owners.get(&identifier) {
                    return Err(CodegenError::ObjectTypeCollision {
                        first: first.clone(),
                        second: tag.to_string(),
                        identifier,
                    });
                }

                owners.insert(identifier.clone(), tag.to_string());
                members.insert(tag.to_string(), identifier);
            }
        }

        debug!(object_types = members.len(), "collected object types");
        Ok(Self { members })
    }

    /// Enum member for a tag; `None` is the sentinel
    pub fn identifier(&self, tag: Option<&str>) -> Result<&str, CodegenError> {
        match tag {
            None => Ok(OBJECT_TYPE_NONE),
            Some(tag) => self
                .members
                .get(tag)
                .map(String::as_str)
                .ok_or_else(|| CodegenError::UnknownObjectType(tag.to_string())),
        }
    }

    /// `(tag, member)` pairs, sentinel excluded
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.members.iter().map(|(t, i)| (t.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
