use super::annotated::AnnotatedText;

/// Asserts the structural guarantees every builder output must satisfy:
/// parts tile the source without gaps or overlaps, and the inverse mapping
/// stays inside the source and never moves backwards.
pub fn check(source: &str, text: &AnnotatedText) {
    assert_eq!(text.source(), source, "annotated text holds a different source");

    let mut expected_start = 0;
    for part in text.parts() {
        assert!(
            part.span.start == expected_start,
            "part does not continue the previous one: {:?} (expected start {})",
            part.span,
            expected_start
        );
        assert!(
            part.span.start <= part.span.end && part.span.end <= source.len(),
            "part span out of bounds: {:?} (source len: {})",
            part.span,
            source.len()
        );
        expected_start = part.span.end;
    }
    assert!(
        expected_start == source.len(),
        "parts stop at {} but the source has {} bytes",
        expected_start,
        source.len()
    );

    let plain_len = text.plain_text().len();
    let mut previous = 0;
    for plain in 0..=plain_len {
        let original = text.original_offset_for(plain);
        assert!(
            original <= source.len(),
            "plain offset {plain} maps outside the source: {original}"
        );
        assert!(
            original >= previous,
            "inverse mapping moves backwards at plain offset {plain}: {original} < {previous}"
        );
        previous = original;
    }
}
