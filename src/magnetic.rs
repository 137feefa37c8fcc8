//! Magnetic variation lookup
//!
//! The DZG positioning sentence carries a magnetic variation field. The
//! value is taken from a [`MagneticModel`], evaluated at the waypoint's own
//! position and date.

use crate::types::Coordinate;
use chrono::{DateTime, Datelike, Timelike, Utc};
use log::debug;

/// Source of magnetic declination, degrees east positive
pub trait MagneticModel {
    fn declination(&self, coordinate: Coordinate, date: DateTime<Utc>) -> f64;
}

/// Constant declination for every position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVariation(pub f64);

impl MagneticModel for FixedVariation {
    fn declination(&self, _coordinate: Coordinate, _date: DateTime<Utc>) -> f64 {
        self.0
    }
}

/// One row of a spherical-harmonic coefficient file:
/// degree, order, g, h (nT) and their secular variation (nT/year)
pub type GaussCoefficient = (u8, u8, f64, f64, f64, f64);

const WGS84_A: f64 = 6378.137;
const WGS84_F: f64 = 1.0 / 298.257223563;
/// Geomagnetic reference radius in km
const REFERENCE_RADIUS: f64 = 6371.2;

/// Field components in nT, geodetic frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldComponents {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

/// Spherical-harmonic main field model, World Magnetic Model 2020 by default.
///
/// Coefficients are advanced linearly from `epoch` with their secular
/// variation. Dates outside `epoch .. epoch + 5` are extrapolated the same
/// way, which loses accuracy gradually.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMagneticModel {
    pub epoch: f64,
    pub coefficients: &'static [GaussCoefficient],
    /// Height above the WGS84 ellipsoid
    pub altitude_km: f64,
}

impl Default for WorldMagneticModel {
    fn default() -> Self {
        Self::wmm2020()
    }
}

impl WorldMagneticModel {
    pub fn wmm2020() -> Self {
        Self {
            epoch: 2020.0,
            coefficients: WMM2020,
            altitude_km: 0.0,
        }
    }

    fn max_degree(&self) -> usize {
        self.coefficients
            .iter()
            .map(|&(n, ..)| n as usize)
            .max()
            .unwrap_or(0)
    }

    /// Field vector at a geodetic position and date
    pub fn field(&self, coordinate: Coordinate, date: DateTime<Utc>) -> FieldComponents {
        let year = decimal_year(date);
        let dt = year - self.epoch;
        if !(0.0..=5.0).contains(&dt) {
            debug!(
                "date {:.2} is outside the model span {:.0}-{:.0}, extrapolating",
                year,
                self.epoch,
                self.epoch + 5.0
            );
        }

        let degree = self.max_degree();
        let mut g = vec![vec![0.0; degree + 1]; degree + 1];
        let mut h = vec![vec![0.0; degree + 1]; degree + 1];
        let schmidt = schmidt_factors(degree);
        for &(n, m, gnm, hnm, dg, dh) in self.coefficients {
            let (n, m) = (n as usize, m as usize);
            g[n][m] = schmidt[n][m] * (gnm + dt * dg);
            h[n][m] = schmidt[n][m] * (hnm + dt * dh);
        }

        // Geodetic to geocentric spherical
        let e2 = WGS84_F * (2.0 - WGS84_F);
        let phi = coordinate.latitude.to_radians();
        let lambda = coordinate.longitude.to_radians();
        let rc = WGS84_A / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let p = (rc + self.altitude_km) * phi.cos();
        let z = (rc * (1.0 - e2) + self.altitude_km) * phi.sin();
        let r = p.hypot(z);
        let phi_c = (z / r).asin();

        // cos and sin of the geocentric colatitude; sin is kept off zero at the poles
        let cos_theta = phi_c.sin();
        let sin_theta = phi_c.cos().max(1e-10);
        let (legendre, d_legendre) = gauss_legendre(degree, cos_theta, sin_theta);

        let (mut north, mut east, mut down) = (0.0, 0.0, 0.0);
        for n in 1..=degree {
            let scale = (REFERENCE_RADIUS / r).powi(n as i32 + 2);
            for m in 0..=n {
                let (sin_m, cos_m) = (m as f64 * lambda).sin_cos();
                let radial = g[n][m] * cos_m + h[n][m] * sin_m;
                north += scale * radial * d_legendre[n][m];
                east += scale * m as f64 * (g[n][m] * sin_m - h[n][m] * cos_m) * legendre[n][m]
                    / sin_theta;
                down -= scale * (n as f64 + 1.0) * radial * legendre[n][m];
            }
        }

        let psi = phi_c - phi;
        FieldComponents {
            north: north * psi.cos() - down * psi.sin(),
            east,
            down: north * psi.sin() + down * psi.cos(),
        }
    }
}

impl MagneticModel for WorldMagneticModel {
    fn declination(&self, coordinate: Coordinate, date: DateTime<Utc>) -> f64 {
        let field = self.field(coordinate, date);
        field.east.atan2(field.north).to_degrees()
    }
}

// Gauss-normalized associated Legendre functions of cos(theta) and their
// derivatives with respect to theta.
fn gauss_legendre(degree: usize, cos_theta: f64, sin_theta: f64) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut p = vec![vec![0.0; degree + 1]; degree + 1];
    let mut dp = vec![vec![0.0; degree + 1]; degree + 1];
    p[0][0] = 1.0;
    for n in 1..=degree {
        for m in 0..=n {
            if n == m {
                p[n][m] = sin_theta * p[n - 1][m - 1];
                dp[n][m] = sin_theta * dp[n - 1][m - 1] + cos_theta * p[n - 1][m - 1];
            } else if n == 1 {
                p[n][m] = cos_theta * p[n - 1][m];
                dp[n][m] = cos_theta * dp[n - 1][m] - sin_theta * p[n - 1][m];
            } else {
                let k = (((n - 1) * (n - 1)) as f64 - (m * m) as f64)
                    / (((2 * n - 1) * (2 * n - 3)) as f64);
                let (p2, dp2) = if m + 2 <= n {
                    (p[n - 2][m], dp[n - 2][m])
                } else {
                    (0.0, 0.0)
                };
                p[n][m] = cos_theta * p[n - 1][m] - k * p2;
                dp[n][m] = cos_theta * dp[n - 1][m] - sin_theta * p[n - 1][m] - k * dp2;
            }
        }
    }
    (p, dp)
}

// Factors taking Gauss-normalized functions to Schmidt semi-normalized
fn schmidt_factors(degree: usize) -> Vec<Vec<f64>> {
    let mut s = vec![vec![0.0; degree + 1]; degree + 1];
    s[0][0] = 1.0;
    for n in 1..=degree {
        s[n][0] = s[n - 1][0] * (2 * n - 1) as f64 / n as f64;
        for m in 1..=n {
            let j = if m == 1 { 2.0 } else { 1.0 };
            s[n][m] = s[n][m - 1] * ((n - m + 1) as f64 * j / (n + m) as f64).sqrt();
        }
    }
    s
}

/// Fractional year, e.g. 2021-07-02T12:00Z is roughly 2021.5
pub fn decimal_year(date: DateTime<Utc>) -> f64 {
    let year = date.year();
    let days_in_year = if chrono::NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    let seconds_of_day = date.num_seconds_from_midnight() as f64;
    year as f64 + (date.ordinal0() as f64 + seconds_of_day / 86_400.0) / days_in_year
}

/// WMM2020 main field and secular variation, epoch 2020.0
pub const WMM2020: &[GaussCoefficient] = &[
    (1, 0, -29404.5, 0.0, 6.7, 0.0),
    (1, 1, -1450.7, 4652.9, 7.7, -25.1),
    (2, 0, -2500.0, 0.0, -11.5, 0.0),
    (2, 1, 2982.0, -2991.6, -7.1, -30.2),
    (2, 2, 1676.8, -734.8, -2.2, -23.9),
    (3, 0, 1363.9, 0.0, 2.8, 0.0),
    (3, 1, -2381.0, -82.2, -6.2, 5.7),
    (3, 2, 1236.2, 241.8, 3.4, -1.0),
    (3, 3, 525.7, -542.9, -12.2, 1.1),
    (4, 0, 903.1, 0.0, -1.1, 0.0),
    (4, 1, 809.4, 282.0, -1.6, 0.2),
    (4, 2, 86.2, -158.4, -6.0, 6.9),
    (4, 3, -309.4, 199.8, 5.4, 3.7),
    (4, 4, 47.9, -350.1, -5.5, -5.6),
    (5, 0, -234.4, 0.0, -0.3, 0.0),
    (5, 1, 363.1, 47.7, 0.6, 0.1),
    (5, 2, 187.8, 208.4, -0.7, 2.5),
    (5, 3, -140.7, -121.3, 0.1, -0.9),
    (5, 4, -151.2, 32.2, 1.2, 3.0),
    (5, 5, 13.7, 99.1, 1.0, 0.5),
    (6, 0, 65.9, 0.0, -0.6, 0.0),
    (6, 1, 65.6, -19.1, -0.4, 0.1),
    (6, 2, 73.0, 25.0, 0.5, -1.8),
    (6, 3, -121.5, 52.7, 1.4, -1.4),
    (6, 4, -36.2, -64.4, -1.4, 0.9),
    (6, 5, 13.5, 9.0, -0.0, 0.1),
    (6, 6, -64.7, 68.1, 0.8, 1.0),
    (7, 0, 80.6, 0.0, -0.1, 0.0),
    (7, 1, -76.8, -51.4, -0.3, 0.5),
    (7, 2, -8.3, -16.8, -0.1, 0.6),
    (7, 3, 56.5, 2.3, 0.7, -0.7),
    (7, 4, 15.8, 23.5, 0.2, -0.2),
    (7, 5, 6.4, -2.2, -0.5, -1.2),
    (7, 6, -7.2, -27.2, -0.8, 0.2),
    (7, 7, 9.8, -1.9, 1.0, 0.3),
    (8, 0, 23.6, 0.0, -0.1, 0.0),
    (8, 1, 9.8, 8.4, 0.1, -0.3),
    (8, 2, -17.5, -15.3, -0.1, 0.7),
    (8, 3, -0.4, 12.8, 0.5, -0.2),
    (8, 4, -21.1, -11.8, -0.1, 0.5),
    (8, 5, 15.3, 14.9, 0.4, -0.3),
    (8, 6, 13.7, 3.6, 0.5, -0.5),
    (8, 7, -16.5, -6.9, 0.0, 0.4),
    (8, 8, -0.3, 2.8, 0.4, 0.1),
    (9, 0, 5.0, 0.0, -0.1, 0.0),
    (9, 1, 8.2, -23.3, -0.2, -0.3),
    (9, 2, 2.9, 11.1, -0.0, 0.2),
    (9, 3, -1.4, 9.8, 0.4, -0.4),
    (9, 4, -1.1, -5.1, -0.3, 0.4),
    (9, 5, -13.3, -6.2, -0.0, 0.1),
    (9, 6, 1.1, 7.8, 0.3, -0.0),
    (9, 7, 8.9, 0.4, -0.0, -0.2),
    (9, 8, -9.3, -1.5, -0.0, 0.5),
    (9, 9, -11.9, 9.7, -0.4, 0.2),
    (10, 0, -1.9, 0.0, 0.0, 0.0),
    (10, 1, -6.2, 3.4, -0.0, -0.0),
    (10, 2, -0.1, -0.2, -0.0, 0.1),
    (10, 3, 1.7, 3.5, 0.2, -0.3),
    (10, 4, -0.9, 4.8, -0.1, 0.1),
    (10, 5, 0.6, -8.6, -0.2, -0.2),
    (10, 6, -0.9, -0.1, -0.0, 0.1),
    (10, 7, 1.9, -4.2, -0.1, -0.0),
    (10, 8, 1.4, -3.4, -0.2, -0.1),
    (10, 9, -2.4, -0.1, -0.1, 0.2),
    (10, 10, -3.9, -8.8, -0.0, -0.0),
    (11, 0, 3.0, 0.0, -0.0, 0.0),
    (11, 1, -1.4, -0.0, -0.1, -0.0),
    (11, 2, -2.5, 2.6, -0.0, 0.1),
    (11, 3, 2.4, -0.5, 0.0, 0.0),
    (11, 4, -0.9, -0.4, -0.0, 0.2),
    (11, 5, 0.3, 0.6, -0.1, -0.0),
    (11, 6, -0.7, -0.2, 0.0, 0.0),
    (11, 7, -0.1, -1.7, -0.0, 0.1),
    (11, 8, 1.4, -1.6, -0.1, -0.0),
    (11, 9, -0.6, -3.0, -0.1, -0.1),
    (11, 10, 0.2, -2.0, -0.1, 0.0),
    (11, 11, 3.1, -2.6, -0.1, -0.0),
    (12, 0, -2.0, 0.0, 0.0, 0.0),
    (12, 1, -0.1, -1.2, -0.0, -0.0),
    (12, 2, 0.5, 0.5, -0.0, 0.0),
    (12, 3, 1.3, 1.4, 0.0, -0.1),
    (12, 4, -1.2, -1.8, -0.0, 0.1),
    (12, 5, 0.7, 0.1, -0.0, -0.0),
    (12, 6, 0.3, 0.7, 0.0, 0.0),
    (12, 7, 0.5, -0.1, -0.0, -0.0),
    (12, 8, -0.2, 0.6, 0.0, 0.1),
    (12, 9, -0.5, 0.2, -0.0, -0.0),
    (12, 10, 0.1, -0.9, -0.0, -0.0),
    (12, 11, -1.1, 0.0, -0.0, 0.0),
    (12, 12, -0.3, 0.5, -0.1, -0.1),
];
