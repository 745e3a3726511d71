use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a spawnable kind.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template#{}", self.0)
    }
}

/// Handle to one pooled instance: owning template plus its slot in that pool.
///
/// Handles stay valid for the whole session because pools never shrink.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct InstanceHandle {
    pub template: TemplateId,
    pub slot: u32,
}

impl InstanceHandle {
    pub const fn new(template: TemplateId, slot: u32) -> Self {
        Self { template, slot }
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.template, self.slot)
    }
}

/// Name of a registered drop table.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropTableId(pub String);

impl DropTableId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for DropTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
