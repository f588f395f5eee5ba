// FormatProbe unit tests

use rstest::rstest;
use shiage::image_optimizer::{probe, ImageFamily};

fn heic_header() -> Vec<u8> {
    let mut data = vec![0, 0, 0, 24];
    data.extend_from_slice(b"ftypmif1");
    data.extend_from_slice(&[0, 0, 0, 0]);
    data.extend_from_slice(b"mif1heic");
    data
}

#[rstest]
#[case(Some("image/heic"), None, ImageFamily::Heif)]
#[case(Some("image/png; charset=binary"), Some("photo.jpg"), ImageFamily::Png)]
#[case(Some("application/octet-stream"), Some("IMG_0042.HEIC"), ImageFamily::Heif)]
#[case(Some("binary/octet-stream"), Some("scan.tiff"), ImageFamily::Tiff)]
#[case(None, Some("banner.webp"), ImageFamily::WebP)]
#[case(None, Some("no-extension"), ImageFamily::Unknown)]
#[case(Some(""), None, ImageFamily::Unknown)]
fn test_declared_metadata(
    #[case] content_type: Option<&str>,
    #[case] filename: Option<&str>,
    #[case] expected: ImageFamily,
) {
    assert_eq!(probe(b"", filename, content_type), expected);
}

#[rstest]
#[case(vec![0xFF, 0xD8, 0xFF, 0xE0], ImageFamily::Jpeg)]
#[case(b"\x89PNG\r\n\x1a\n....".to_vec(), ImageFamily::Png)]
#[case(b"GIF89a......".to_vec(), ImageFamily::Gif)]
#[case(b"RIFF\0\0\0\0WEBPVP8 ".to_vec(), ImageFamily::WebP)]
#[case(b"II*\0\x08\0\0\0".to_vec(), ImageFamily::Tiff)]
#[case(heic_header(), ImageFamily::Heif)]
#[case(b"hello world".to_vec(), ImageFamily::Unknown)]
fn test_magic_bytes_when_metadata_is_generic(#[case] data: Vec<u8>, #[case] expected: ImageFamily) {
    assert_eq!(
        probe(&data, Some("upload"), Some("application/octet-stream")),
        expected
    );
}

#[test]
fn test_only_heif_needs_the_converter() {
    let families = [
        ImageFamily::Jpeg,
        ImageFamily::Png,
        ImageFamily::WebP,
        ImageFamily::Tiff,
        ImageFamily::Bmp,
        ImageFamily::Gif,
    ];
    assert!(families.iter().all(|f| f.is_natively_decodable()));
    assert!(!ImageFamily::Heif.is_natively_decodable());
}
