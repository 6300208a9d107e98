//! Behavioral tests for the ingestor against the stub engine.
//!
//! Covers buffer ownership across submissions, raw pixel passthrough,
//! bitmap detection and normalization, orientation scanning and engine
//! rejections.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use ocr_ingest::{
    is_bitmap, scan_orientation, IngestError, Ingestor, InputImage, NativePtr, SessionCall,
    StubEngine, DEFAULT_INPUT_PATH, SET_IMAGE_FILE_FAILED,
};

fn setup() -> (StubEngine, Ingestor<StubEngine>) {
    let engine = StubEngine::new(1 << 20);
    let ingestor = Ingestor::new(engine.clone());
    (engine, ingestor)
}

fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)
        .expect("encode test image");
    out
}

/// 2x1 8-bit palettized bitmap with RLE8 compression: red, blue.
fn rle8_bitmap() -> Vec<u8> {
    let pixel_data: [u8; 8] = [1, 0, 1, 1, 0, 0, 0, 1];
    let offset: u32 = 14 + 40 + 8;
    let file_size = offset + pixel_data.len() as u32;

    let mut bmp = Vec::new();
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&file_size.to_le_bytes());
    bmp.extend_from_slice(&[0, 0, 0, 0]);
    bmp.extend_from_slice(&offset.to_le_bytes());

    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&2i32.to_le_bytes());
    bmp.extend_from_slice(&1i32.to_le_bytes());
    bmp.extend_from_slice(&1u16.to_le_bytes());
    bmp.extend_from_slice(&8u16.to_le_bytes());
    bmp.extend_from_slice(&1u32.to_le_bytes()); // BI_RLE8
    bmp.extend_from_slice(&(pixel_data.len() as u32).to_le_bytes());
    bmp.extend_from_slice(&2835i32.to_le_bytes());
    bmp.extend_from_slice(&2835i32.to_le_bytes());
    bmp.extend_from_slice(&2u32.to_le_bytes());
    bmp.extend_from_slice(&0u32.to_le_bytes());

    // Palette entries are BGRx.
    bmp.extend_from_slice(&[0, 0, 255, 0]);
    bmp.extend_from_slice(&[255, 0, 0, 0]);

    bmp.extend_from_slice(&pixel_data);
    bmp
}

fn orientation_entry(value: u8) -> Vec<u8> {
    vec![1, 18, 0, 3, 0, 0, 0, 1, 0, value]
}

#[test]
fn single_buffer_outstanding_across_pixel_submissions() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    for i in 0..5u8 {
        let image = InputImage::pixels(2, 2, vec![i; 16]).expect("pixels");
        ingestor.submit(&mut session, &image, 0).expect("submit");

        let live = engine.live_allocations();
        assert_eq!(live.len(), 1);
        assert_eq!(Some(live[0]), ingestor.pending_buffer());
        assert_eq!(engine.heap_slice(live[0].0, 16), Some(vec![i; 16]));
    }

    assert_eq!(engine.total_allocations(), 5);
    assert_eq!(engine.total_frees(), 4);
    assert_eq!(engine.invalid_frees(), 0);

    match engine.calls().last() {
        Some(SessionCall::SetImage { ptr, .. }) => {
            assert_eq!(*ptr, engine.live_allocations()[0].0.addr());
        }
        other => panic!("unexpected last call: {:?}", other),
    }

    drop(ingestor);
    assert!(engine.live_allocations().is_empty());
    assert_eq!(engine.total_frees(), 5);
    assert_eq!(engine.invalid_frees(), 0);
}

#[test]
fn nonzero_angle_rejected_for_pixels_without_allocation() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let first = InputImage::pixels(1, 1, vec![1, 2, 3, 4]).expect("pixels");
    ingestor.submit(&mut session, &first, 0).expect("submit");
    assert_eq!(engine.total_allocations(), 1);

    let err = ingestor.submit(&mut session, &first, 5).unwrap_err();
    assert!(matches!(err, IngestError::InvalidArgument(_)));

    assert_eq!(engine.total_allocations(), 1);
    assert!(engine.live_allocations().is_empty());
    assert!(ingestor.pending_buffer().is_none());
    assert_eq!(engine.calls().len(), 1);
}

#[test]
fn pixel_bytes_reach_engine_unchanged() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let bytes = vec![10, 20, 30, 255, 40, 50, 60, 255];
    let image = InputImage::pixels(2, 1, bytes.clone()).expect("pixels");
    ingestor.submit(&mut session, &image, 0).expect("submit");

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        SessionCall::SetImage {
            width,
            height,
            depth,
            stride,
            pixels,
            ..
        } => {
            assert_eq!((*width, *height, *depth, *stride), (2, 1, 4, 8));
            assert_eq!(pixels, &bytes);
        }
        other => panic!("expected raw pixel submission, got {:?}", other),
    }
}

#[test]
fn single_pixel_image_end_to_end() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let image = InputImage::pixels(1, 1, vec![1, 2, 3, 4]).expect("pixels");
    ingestor.submit(&mut session, &image, 0).expect("submit");

    let calls = engine.calls();
    assert_eq!(calls.len(), 1);
    let SessionCall::SetImage {
        ptr,
        width,
        height,
        depth,
        stride,
        pixels,
    } = &calls[0]
    else {
        panic!("expected raw pixel submission, got {:?}", calls[0]);
    };
    assert_eq!((*width, *height, *depth, *stride), (1, 1, 4, 4));
    assert_eq!(pixels, &vec![1, 2, 3, 4]);
    assert_eq!(
        engine.heap_slice(NativePtr::new(*ptr), 4),
        Some(vec![1, 2, 3, 4])
    );
    assert!(engine.file(DEFAULT_INPUT_PATH).is_none());
}

#[test]
fn bitmap_markers_are_classified() {
    assert!(is_bitmap(&[66, 77, 1, 2]));
    assert!(is_bitmap(&[77, 66, 1, 2]));
    assert!(!is_bitmap(&[0xFF, 0xD8, 0xFF, 0xE0]));
}

#[test]
fn orientation_defaults_without_tag() {
    let mut bytes = vec![0u8; 500];
    bytes.extend(orientation_entry(6));
    assert_eq!(scan_orientation(&bytes), 1);
    assert_eq!(scan_orientation(&orientation_entry(6)), 6);
}

#[test]
fn compressed_bitmap_is_normalized_before_submission() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let input = rle8_bitmap();
    ingestor
        .submit(&mut session, &InputImage::encoded(input.clone()), 0)
        .expect("submit bitmap");

    let written = engine.file(DEFAULT_INPUT_PATH).expect("input slot written");
    assert_ne!(written, input);
    assert_eq!(&written[..2], b"BM");
    // Uncompressed 24-bit output.
    assert_eq!(u16::from_le_bytes([written[28], written[29]]), 24);
    assert_eq!(
        u32::from_le_bytes([written[30], written[31], written[32], written[33]]),
        0
    );

    let decoded = image::load_from_memory_with_format(&written, ImageFormat::Bmp)
        .expect("written bytes parse as bitmap")
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (2, 1));
    assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 0, 0]));
    assert_eq!(decoded.get_pixel(1, 0), &Rgb([0, 0, 255]));

    assert_eq!(
        engine.calls(),
        vec![SessionCall::SetImageFile {
            exif_orientation: 1,
            angle: 0,
            result: 0,
            format: Some("bmp".to_string()),
            width: Some(2),
            height: Some(1),
        }]
    );
}

#[test]
fn non_bitmap_streams_are_written_verbatim() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let img = RgbImage::from_pixel(4, 3, Rgb([200, 200, 200]));
    let png = encode(&img, ImageFormat::Png);
    ingestor
        .submit(&mut session, &InputImage::encoded(png.clone()), 90)
        .expect("submit png");

    assert_eq!(engine.file(DEFAULT_INPUT_PATH), Some(png));
    assert_eq!(
        engine.calls(),
        vec![SessionCall::SetImageFile {
            exif_orientation: 1,
            angle: 90,
            result: 0,
            format: Some("png".to_string()),
            width: Some(4),
            height: Some(3),
        }]
    );
    assert_eq!(engine.total_allocations(), 0);
}

#[test]
fn engine_rejection_surfaces_unreadable_image() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let mut garbage = vec![0x00, 0x11, 0x22];
    garbage.extend(orientation_entry(6));
    let err = ingestor
        .submit(&mut session, &InputImage::encoded(garbage.clone()), 0)
        .unwrap_err();
    assert!(matches!(err, IngestError::UnreadableImage));

    // The input slot stays in place after a rejection.
    assert_eq!(engine.file(DEFAULT_INPUT_PATH), Some(garbage));
    match engine.calls().as_slice() {
        [SessionCall::SetImageFile {
            exif_orientation,
            result,
            ..
        }] => {
            assert_eq!(*exif_orientation, 6);
            assert_eq!(*result, SET_IMAGE_FILE_FAILED);
        }
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[test]
fn encoded_submission_releases_previous_pixels() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let pixels = InputImage::pixels(1, 1, vec![1, 2, 3, 4]).expect("pixels");
    ingestor.submit(&mut session, &pixels, 0).expect("submit pixels");
    assert_eq!(engine.live_allocations().len(), 1);

    let png = encode(&RgbImage::new(1, 1), ImageFormat::Png);
    ingestor
        .submit(&mut session, &InputImage::encoded(png), 0)
        .expect("submit png");

    assert!(engine.live_allocations().is_empty());
    assert!(ingestor.pending_buffer().is_none());
    assert_eq!(engine.total_frees(), 1);
}

#[test]
fn swapped_bitmap_marker_fails_normalization() {
    let (engine, mut ingestor) = setup();
    let mut session = engine.session();

    let mut bmp = encode(&RgbImage::new(2, 2), ImageFormat::Bmp);
    bmp.swap(0, 1);
    let err = ingestor
        .submit(&mut session, &InputImage::encoded(bmp), 0)
        .unwrap_err();
    assert!(matches!(err, IngestError::Codec(_)));
    assert!(engine.file(DEFAULT_INPUT_PATH).is_none());
    assert!(engine.calls().is_empty());
}

#[test]
fn out_of_memory_is_reported_as_engine_error() {
    let engine = StubEngine::new(64);
    let mut session = engine.session();
    let mut ingestor = Ingestor::new(engine.clone());

    let image = InputImage::pixels(8, 8, vec![0; 256]).expect("pixels");
    let err = ingestor.submit(&mut session, &image, 0).unwrap_err();
    assert!(matches!(err, IngestError::Engine(_)));
    assert!(err.to_string().contains("out of memory"));
    assert!(ingestor.pending_buffer().is_none());
}
