use crate::detection::record::{DefectLabel, Detection};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

const BOX_THICKNESS: u32 = 2;
const POTHOLE_COLOR: Rgb<u8> = Rgb([220, 38, 38]);
const CRACK_COLOR: Rgb<u8> = Rgb([255, 191, 0]);

fn label_color(label: DefectLabel) -> Rgb<u8> {
    if label.is_pothole() {
        POTHOLE_COLOR
    } else {
        CRACK_COLOR
    }
}

/// Returns an RGB copy of `image` with one outlined box per detection.
pub fn annotate(image: &DynamicImage, detections: &[Detection]) -> DynamicImage {
    let mut canvas: RgbImage = image.to_rgb8();
    for detection in detections {
        let bbox = detection.bbox;
        let color = label_color(detection.label);
        for inset in 0..BOX_THICKNESS {
            let width = bbox.width().saturating_sub(2 * inset);
            let height = bbox.height().saturating_sub(2 * inset);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, rect, color);
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

/// Encodes an image as PNG bytes for embedding in a page.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::record::BoundingBox;
    use image::GenericImageView;

    #[test]
    fn annotation_keeps_dimensions_and_marks_box_edges() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(60, 40));
        let bbox = BoundingBox::new(10, 5, 40, 30, 60, 40).unwrap();
        let detections = vec![Detection::new(DefectLabel::Pothole, 0.9, bbox).unwrap()];

        let annotated = annotate(&image, &detections);
        assert_eq!(annotated.dimensions(), (60, 40));
        let rgb = annotated.to_rgb8();
        assert_eq!(*rgb.get_pixel(10, 5), POTHOLE_COLOR);
        assert_eq!(*rgb.get_pixel(11, 6), POTHOLE_COLOR);
        assert_eq!(*rgb.get_pixel(25, 17), Rgb([0, 0, 0]));
    }

    #[test]
    fn box_touching_image_edge_is_drawn_without_panicking() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let bbox = BoundingBox::new(0, 0, 8, 8, 8, 8).unwrap();
        let detections = vec![Detection::new(DefectLabel::Crack, 0.7, bbox).unwrap()];
        let annotated = annotate(&image, &detections).to_rgb8();
        assert_eq!(*annotated.get_pixel(7, 7), CRACK_COLOR);
    }

    #[test]
    fn png_encoding_round_trips_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(12, 9));
        let bytes = encode_png(&image).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (12, 9));
    }
}
