use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250601_000002_create_driver_profiles::DriverProfile;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Service type enum is shared by vehicles and bookings
        manager
            .create_type(
                Type::create()
                    .as_enum(ServiceType::Enum)
                    .values([
                        ServiceType::TwoWheeler,
                        ServiceType::Truck,
                        ServiceType::Intercity,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vehicle::Table)
                    .if_not_exists()
                    .col(uuid(Vehicle::Id).primary_key())
                    .col(uuid(Vehicle::DriverProfileId).not_null())
                    .col(
                        ColumnDef::new(Vehicle::VehicleType)
                            .custom(ServiceType::Enum)
                            .not_null(),
                    )
                    .col(string_len(Vehicle::VehicleNumber, 20).not_null().unique_key())
                    .col(string_len(Vehicle::VehicleModel, 100).not_null())
                    .col(boolean(Vehicle::IsActive).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Vehicle::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vehicle_driver_profile")
                            .from(Vehicle::Table, Vehicle::DriverProfileId)
                            .to(DriverProfile::Table, DriverProfile::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vehicle::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(ServiceType::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Vehicle {
    Table,
    Id,
    DriverProfileId,
    VehicleType,
    VehicleNumber,
    VehicleModel,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum ServiceType {
    #[sea_orm(iden = "service_type")]
    Enum,
    #[sea_orm(iden = "two_wheeler")]
    TwoWheeler,
    #[sea_orm(iden = "truck")]
    Truck,
    #[sea_orm(iden = "intercity")]
    Intercity,
}
