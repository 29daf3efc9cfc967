use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20250601_000001_create_users::User;
use super::m20250601_000002_create_driver_profiles::DriverProfile;
use super::m20250601_000003_create_vehicles::{ServiceType, Vehicle};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(BookingStatus::Enum)
                    .values([
                        BookingStatus::Pending,
                        BookingStatus::Confirmed,
                        BookingStatus::DriverAssigned,
                        BookingStatus::DriverArrived,
                        BookingStatus::InProgress,
                        BookingStatus::Completed,
                        BookingStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(PaymentMethod::Enum)
                    .values([PaymentMethod::Cash, PaymentMethod::Upi, PaymentMethod::Card])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(string_len(Booking::BookingNumber, 20).not_null().unique_key())
                    .col(uuid(Booking::CustomerId).not_null())
                    .col(uuid_null(Booking::DriverId))
                    .col(uuid_null(Booking::VehicleId))
                    .col(
                        ColumnDef::new(Booking::ServiceType)
                            .custom(ServiceType::Enum)
                            .not_null(),
                    )
                    .col(string_len(Booking::PickupAddress, 500).not_null())
                    .col(double(Booking::PickupLat).not_null())
                    .col(double(Booking::PickupLng).not_null())
                    .col(string_len(Booking::DropoffAddress, 500).not_null())
                    .col(double(Booking::DropoffLat).not_null())
                    .col(double(Booking::DropoffLng).not_null())
                    .col(timestamp_with_time_zone(Booking::PickupAt).not_null())
                    .col(double(Booking::EstimatedFare).not_null())
                    .col(double_null(Booking::ActualFare))
                    .col(
                        ColumnDef::new(Booking::PaymentMethod)
                            .custom(PaymentMethod::Enum)
                            .not_null(),
                    )
                    .col(string_null(Booking::Notes))
                    .col(
                        ColumnDef::new(Booking::Status)
                            .custom(BookingStatus::Enum)
                            .not_null(),
                    )
                    .col(timestamp_with_time_zone_null(Booking::StartedAt))
                    .col(timestamp_with_time_zone_null(Booking::CompletedAt))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_customer")
                            .from(Booking::Table, Booking::CustomerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_driver_profile")
                            .from(Booking::Table, Booking::DriverId)
                            .to(DriverProfile::Table, DriverProfile::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_vehicle")
                            .from(Booking::Table, Booking::VehicleId)
                            .to(Vehicle::Table, Vehicle::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(PaymentMethod::Enum).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    BookingNumber,
    CustomerId,
    DriverId,
    VehicleId,
    ServiceType,
    PickupAddress,
    PickupLat,
    PickupLng,
    DropoffAddress,
    DropoffLat,
    DropoffLng,
    PickupAt,
    EstimatedFare,
    ActualFare,
    PaymentMethod,
    Notes,
    Status,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "pending")]
    Pending,
    #[sea_orm(iden = "confirmed")]
    Confirmed,
    #[sea_orm(iden = "driver_assigned")]
    DriverAssigned,
    #[sea_orm(iden = "driver_arrived")]
    DriverArrived,
    #[sea_orm(iden = "in_progress")]
    InProgress,
    #[sea_orm(iden = "completed")]
    Completed,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}

#[derive(DeriveIden)]
pub enum PaymentMethod {
    #[sea_orm(iden = "payment_method")]
    Enum,
    #[sea_orm(iden = "cash")]
    Cash,
    #[sea_orm(iden = "upi")]
    Upi,
    #[sea_orm(iden = "card")]
    Card,
}
