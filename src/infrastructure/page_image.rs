//! 页面图片编码
//!
//! 渲染结果统一编码为 JPEG，再包成 `data:image/jpeg;base64,...`，
//! 站点数据因此是自包含的，不依赖外部文件。

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::RenderError;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// 编码好的页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// 编码为 JPEG data URI
pub fn encode_jpeg_data_uri(img: &DynamicImage, quality: u8) -> Result<EncodedImage, RenderError> {
    // JPEG 不支持透明通道
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buffer = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)))?;

    Ok(EncodedImage {
        data_uri: format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(&buffer)),
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// 按比例缩放，比例为 1 时原样返回
pub fn scale_image(img: DynamicImage, scale: f32) -> DynamicImage {
    if !(scale.is_finite() && scale > 0.0) || (scale - 1.0).abs() < f32::EPSILON {
        return img;
    }

    let width = ((img.width() as f32) * scale).round().max(1.0) as u32;
    let height = ((img.height() as f32) * scale).round().max(1.0) as u32;
    img.resize_exact(width, height, FilterType::Triangle)
}

/// 从 data URI 取回 JPEG 字节，用于导出
pub fn decode_data_uri(data_uri: &str) -> Option<Vec<u8>> {
    let payload = data_uri.strip_prefix(DATA_URI_PREFIX)?;
    STANDARD.decode(payload).ok()
}
