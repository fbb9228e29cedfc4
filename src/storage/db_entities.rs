//! SeaORM entity model used by the database storage backend.
//!
//! Maps to the single `audio_backups` table created by `database_storage`.

use sea_orm::entity::prelude::*;

/// Audio backups table entity model.
///
/// Ids and status are stored as strings for portability.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "audio_backups")]
pub struct Model {
    /// UUID as string primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Raw audio payload
    pub blob: Vec<u8>,
    pub filename: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    pub duration_seconds: Option<f64>,
    /// "pending" | "synced" | "failed"
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
