//! Fixed-boundary demographic buckets

use serde::{Deserialize, Serialize};

/// Driver age band for segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverAgeBucket {
    /// [18, 25)
    Age18To25,
    /// [25, 35)
    Age26To35,
    /// [35, 45)
    Age36To45,
    /// [45, 55)
    Age46To55,
    /// [55, 65)
    Age56To65,
    /// [65, Inf)
    Age65Plus,
}

impl DriverAgeBucket {
    /// Determine bucket from driver age
    pub fn from_age(age: f64) -> Self {
        if age < 25.0 {
            DriverAgeBucket::Age18To25
        } else if age < 35.0 {
            DriverAgeBucket::Age26To35
        } else if age < 45.0 {
            DriverAgeBucket::Age36To45
        } else if age < 55.0 {
            DriverAgeBucket::Age46To55
        } else if age < 65.0 {
            DriverAgeBucket::Age56To65
        } else {
            DriverAgeBucket::Age65Plus
        }
    }

    /// String representation used in report tables
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverAgeBucket::Age18To25 => "18-25",
            DriverAgeBucket::Age26To35 => "26-35",
            DriverAgeBucket::Age36To45 => "36-45",
            DriverAgeBucket::Age46To55 => "46-55",
            DriverAgeBucket::Age56To65 => "56-65",
            DriverAgeBucket::Age65Plus => "65+",
        }
    }
}

/// Vehicle age band, in years since model year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleAgeBucket {
    /// [0, 2]
    Years0To2,
    /// [3, 5]
    Years3To5,
    /// [6, 10]
    Years6To10,
    /// [11, 15]
    Years11To15,
    /// (15, Inf)
    Years15Plus,
}

impl VehicleAgeBucket {
    /// Determine bucket from vehicle age in years, lower edge inclusive
    pub fn from_years(years: i32) -> Self {
        if years <= 2 {
            VehicleAgeBucket::Years0To2
        } else if years <= 5 {
            VehicleAgeBucket::Years3To5
        } else if years <= 10 {
            VehicleAgeBucket::Years6To10
        } else if years <= 15 {
            VehicleAgeBucket::Years11To15
        } else {
            VehicleAgeBucket::Years15Plus
        }
    }

    /// String representation used in report tables
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleAgeBucket::Years0To2 => "0-2",
            VehicleAgeBucket::Years3To5 => "3-5",
            VehicleAgeBucket::Years6To10 => "6-10",
            VehicleAgeBucket::Years11To15 => "11-15",
            VehicleAgeBucket::Years15Plus => "15+",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_age_buckets() {
        assert_eq!(DriverAgeBucket::from_age(18.0), DriverAgeBucket::Age18To25);
        assert_eq!(DriverAgeBucket::from_age(24.9), DriverAgeBucket::Age18To25);
        assert_eq!(DriverAgeBucket::from_age(25.0), DriverAgeBucket::Age26To35);
        assert_eq!(DriverAgeBucket::from_age(44.0), DriverAgeBucket::Age36To45);
        assert_eq!(DriverAgeBucket::from_age(64.9), DriverAgeBucket::Age56To65);
        assert_eq!(DriverAgeBucket::from_age(65.0), DriverAgeBucket::Age65Plus);
        assert_eq!(DriverAgeBucket::from_age(90.0), DriverAgeBucket::Age65Plus);
    }

    #[test]
    fn test_vehicle_age_buckets() {
        assert_eq!(VehicleAgeBucket::from_years(0), VehicleAgeBucket::Years0To2);
        assert_eq!(VehicleAgeBucket::from_years(2), VehicleAgeBucket::Years0To2);
        assert_eq!(VehicleAgeBucket::from_years(3), VehicleAgeBucket::Years3To5);
        assert_eq!(VehicleAgeBucket::from_years(10), VehicleAgeBucket::Years6To10);
        assert_eq!(VehicleAgeBucket::from_years(11), VehicleAgeBucket::Years11To15);
        assert_eq!(VehicleAgeBucket::from_years(16), VehicleAgeBucket::Years15Plus);
    }
}
