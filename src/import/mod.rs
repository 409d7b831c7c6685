pub mod gpx;
pub mod points;
