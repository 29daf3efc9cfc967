use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DriverProfile::Table)
                    .if_not_exists()
                    .col(uuid(DriverProfile::Id).primary_key())
                    .col(uuid(DriverProfile::UserId).not_null().unique_key())
                    .col(string_len(DriverProfile::LicenseNumber, 20).not_null())
                    .col(boolean(DriverProfile::IsOnline).not_null().default(false))
                    .col(double_null(DriverProfile::LastLat))
                    .col(double_null(DriverProfile::LastLng))
                    .col(
                        timestamp_with_time_zone(DriverProfile::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_driver_profile_user")
                            .from(DriverProfile::Table, DriverProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DriverProfile::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DriverProfile {
    Table,
    Id,
    UserId,
    LicenseNumber,
    IsOnline,
    LastLat,
    LastLng,
    CreatedAt,
}
