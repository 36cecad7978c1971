pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, TrackError};
pub use types::{
    ActualsField, ActualsSchema, CostCategory, EntityKind, FieldKind, PlannedEntity, RawActuals,
};
pub use value::CellValue;
