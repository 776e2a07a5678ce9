//! Integration tests for label markup
//!
//! Every schema label has to render both ways: as plot markup and as plain
//! text for table headers.

mod common;

use xrd_rs::mathtext::{
    handle_customs, handle_customs_bytes, mt_frac, mt_range, plot_safe, string_safe,
    FONT_SIZE_LARGE, FONT_SIZE_NORMAL,
};
use xrd_rs::project::{PHASE_SCHEMA, PROJECT_SCHEMA, SPECIMEN_SCHEMA};
use xrd_rs::XrdError;

#[test]
fn test_schema_labels_render_as_plain_text() {
    for schema in [&SPECIMEN_SCHEMA, &PHASE_SCHEMA, &PROJECT_SCHEMA] {
        for property in schema.properties() {
            let text = string_safe(property.label());
            assert!(!text.contains('$'), "{:?} -> {:?}", property.label(), text);
            assert!(!text.contains('\\'), "{:?} -> {:?}", property.label(), text);
            assert!(!text.trim().is_empty());
        }
    }
}

#[test]
fn test_sample_length_label() {
    let label = SPECIMEN_SCHEMA.property("sample_length").unwrap().label();
    let (fragments, size) = handle_customs(label);
    assert_eq!(size, FONT_SIZE_LARGE);
    assert_eq!(fragments, vec![" Sample length (cm)"]);
    assert_eq!(string_safe(label).trim(), "Sample length (cm)");
}

#[test]
fn test_phase_labels() {
    let weight = PHASE_SCHEMA.property("weight_fraction").unwrap().label();
    assert_eq!(string_safe(weight), "Wphase");

    let sigma = PHASE_SCHEMA.property("sigma_star").unwrap().label();
    assert_eq!(plot_safe(sigma), r"$\sigma$*");
    assert_eq!(string_safe(sigma), "σ*");
}

#[test]
fn test_multiline_label() {
    let (fragments, size) = handle_customs(r"2θ (°)\newlineCu Kα");
    assert_eq!(size, FONT_SIZE_NORMAL);
    assert_eq!(fragments, vec![r"2$\theta$ (°)", r"Cu K$\alpha$"]);
    assert_eq!(string_safe(r"2θ\newlineCu"), "2θ\nCu");
}

#[test]
fn test_range_markup_both_ways() {
    let markup = mt_range(0.0, "x", 0.5);
    assert_eq!(markup, r"\left({ 0 \leq x \leq \frac{1}{2} }\right)");
    assert_eq!(plot_safe(&markup), markup);
    assert_eq!(string_safe(&markup), r"( 0 ≤ x ≤ 1\2 )");
}

#[test]
fn test_fraction_markup() {
    assert_eq!(mt_frac(0.25), r"\frac{1}{4}");
    assert_eq!(mt_frac(-1.5), r"\frac{-3}{2}");
    assert_eq!(mt_frac(3.0), "3");
    assert_eq!(string_safe(r"\frac{12}{34}"), r"(12)\(34)");
}

#[test]
fn test_label_bytes_must_be_utf8() {
    let (fragments, _) = handle_customs_bytes("β".as_bytes()).unwrap();
    assert_eq!(fragments, vec![r"$\beta$"]);

    let err = handle_customs_bytes(&[0x66, 0xff, 0xfe]).unwrap_err();
    assert!(matches!(err, XrdError::Markup(_)));
}
