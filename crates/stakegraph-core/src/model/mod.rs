//! Stakeholder graph data model.

pub mod relation;
pub mod stakeholder;

pub use relation::{NewRelation, Relation};
pub use stakeholder::{
    ColumnMatch, ParseColumnError, Stakeholder, StakeholderColumn, StakeholderDraft,
    StakeholderFields, StakeholderTree,
};
