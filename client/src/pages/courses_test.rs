use super::*;
use crate::net::types::Video;

#[test]
fn format_price_treats_zero_as_free() {
    assert_eq!(format_price(None), "Free");
    assert_eq!(format_price(Some(0.0)), "Free");
    assert_eq!(format_price(Some(49.5)), "$49.50");
}

#[test]
fn course_summary_lists_known_facts() {
    let course = Course {
        id: 1,
        title: "Async Rust".to_owned(),
        level: Some("ADVANCED".to_owned()),
        price: Some(19.0),
        instructor_name: Some("Ana".to_owned()),
        videos: vec![Video { id: 1, title: "Intro".to_owned(), ..Video::default() }],
        ..Course::default()
    };
    assert_eq!(course_summary(&course), "ADVANCED · $19.00 · by Ana · 1 video");
}

#[test]
fn course_summary_for_bare_course() {
    let course = Course { id: 2, title: "Draft".to_owned(), ..Course::default() };
    assert_eq!(course_summary(&course), "Free");
}
