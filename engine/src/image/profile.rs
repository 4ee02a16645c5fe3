use super::raster::Raster;
use sdk::ImageProfile;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Profile a decoded raw image
pub fn profile_image(raster: &Raster, file_size_bytes: u64) -> ImageProfile {
    let (means, stds) = raster.channel_stats();
    let (width, height) = (raster.width(), raster.height());

    ImageProfile {
        width: width as u32,
        height: height as u32,
        aspect_ratio: if height > 0 {
            round_to(width as f64 / height as f64, 3)
        } else {
            0.0
        },
        file_size_bytes,
        mean_pixel: means.into_iter().map(|m| round_to(m, 2)).collect(),
        std_pixel: stds.into_iter().map(|s| round_to(s, 2)).collect(),
    }
}
