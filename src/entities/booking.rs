use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle states of a booking. `Confirmed` is a legacy pre-assignment state
/// kept in the cancellable window alongside `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "booking_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "driver_assigned")]
    DriverAssigned,
    #[sea_orm(string_value = "driver_arrived")]
    DriverArrived,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    /// No transitions are defined out of a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// A customer may cancel only before the driver is on the way.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::DriverAssigned
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "service_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    #[sea_orm(string_value = "two_wheeler")]
    TwoWheeler,
    #[sea_orm(string_value = "truck")]
    Truck,
    #[sea_orm(string_value = "intercity")]
    Intercity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "upi")]
    Upi,
    #[sea_orm(string_value = "card")]
    Card,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub booking_number: String,
    pub customer_id: Uuid,
    /// Driver profile id, set exactly once by the accept transition.
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub service_type: ServiceType,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub pickup_at: DateTimeWithTimeZone,
    pub estimated_fare: f64,
    pub actual_fare: Option<f64>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub started_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CustomerId",
        to = "super::user::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::driver_profile::Entity",
        from = "Column::DriverId",
        to = "super::driver_profile::Column::Id"
    )]
    Driver,
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::driver_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Driver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_window_covers_pre_trip_states_only() {
        assert!(BookingStatus::Pending.is_cancellable());
        assert!(BookingStatus::Confirmed.is_cancellable());
        assert!(BookingStatus::DriverAssigned.is_cancellable());

        assert!(!BookingStatus::DriverArrived.is_cancellable());
        assert!(!BookingStatus::InProgress.is_cancellable());
        assert!(!BookingStatus::Completed.is_cancellable());
        assert!(!BookingStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn only_completed_and_cancelled_are_terminal() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());

        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(!BookingStatus::DriverAssigned.is_terminal());
        assert!(!BookingStatus::DriverArrived.is_terminal());
        assert!(!BookingStatus::InProgress.is_terminal());
    }

    #[test]
    fn status_uses_wire_casing() {
        let json = serde_json::to_string(&BookingStatus::DriverAssigned).unwrap();
        assert_eq!(json, "\"DRIVER_ASSIGNED\"");

        let parsed: BookingStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(parsed, BookingStatus::InProgress);
    }
}
