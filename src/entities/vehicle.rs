use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::booking::ServiceType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicle")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub driver_profile_id: Uuid,
    pub vehicle_type: ServiceType,
    #[sea_orm(unique)]
    pub vehicle_number: String,
    pub vehicle_model: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::driver_profile::Entity",
        from = "Column::DriverProfileId",
        to = "super::driver_profile::Column::Id"
    )]
    DriverProfile,
}

impl Related<super::driver_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DriverProfile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
