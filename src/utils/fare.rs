use crate::entities::booking::ServiceType;

/// Static per-service rate card, in rupees.
#[derive(Debug, Clone, Copy)]
pub struct RateCard {
    pub base_fare: f64,
    pub per_km: f64,
    pub minimum_fare: f64,
}

pub fn rate_card(service: ServiceType) -> RateCard {
    match service {
        ServiceType::TwoWheeler => RateCard {
            base_fare: 30.0,
            per_km: 10.0,
            minimum_fare: 50.0,
        },
        ServiceType::Truck => RateCard {
            base_fare: 150.0,
            per_km: 35.0,
            minimum_fare: 300.0,
        },
        ServiceType::Intercity => RateCard {
            base_fare: 100.0,
            per_km: 14.0,
            minimum_fare: 250.0,
        },
    }
}

/// Flat per-km fare with a floor, rounded to whole rupees.
pub fn estimate_fare(service: ServiceType, distance_km: f64) -> f64 {
    let card = rate_card(service);
    let fare = card.base_fare + card.per_km * distance_km;
    fare.max(card.minimum_fare).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_trips_pay_the_minimum() {
        assert_eq!(estimate_fare(ServiceType::TwoWheeler, 1.0), 50.0);
        assert_eq!(estimate_fare(ServiceType::Truck, 2.0), 300.0);
    }

    #[test]
    fn longer_trips_scale_per_km() {
        // 30 + 10 * 12 = 150
        assert_eq!(estimate_fare(ServiceType::TwoWheeler, 12.0), 150.0);
        // 150 + 35 * 20 = 850
        assert_eq!(estimate_fare(ServiceType::Truck, 20.0), 850.0);
        // 100 + 14 * 120 = 1780
        assert_eq!(estimate_fare(ServiceType::Intercity, 120.0), 1780.0);
    }

    #[test]
    fn fares_are_whole_rupees() {
        let fare = estimate_fare(ServiceType::Intercity, 33.7);
        assert_eq!(fare, fare.round());
    }
}
