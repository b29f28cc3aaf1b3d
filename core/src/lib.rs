#[cfg(feature = "io_ext")]
pub mod io_ext;

#[cfg(feature = "nom_ext")]
pub mod nom_ext;

pub mod scene;
pub mod texture;

/// Rounds a float to a fixed number of decimal digits, returning the scaled integer
pub fn quantize(value: f32, digits: i32) -> i64 {
	((value as f64) * 10f64.powi(digits)).round() as i64
}

/// Inverse of [`quantize`]
pub fn dequantize(value: i64, digits: i32) -> f32 {
	((value as f64) / 10f64.powi(digits)) as f32
}
