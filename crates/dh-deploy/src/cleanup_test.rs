use super::*;
use chrono::NaiveDate;

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

#[test]
fn test_removes_oldest_beyond_keep() {
    let releases: Vec<_> = (1..=7).map(day).collect();
    assert_eq!(releases_to_remove(&releases, 5), vec![day(1), day(2)]);
}

#[test]
fn test_nothing_to_remove() {
    let releases: Vec<_> = (1..=3).map(day).collect();
    assert!(releases_to_remove(&releases, 5).is_empty());
    assert!(releases_to_remove(&[], 5).is_empty());
}

#[test]
fn test_always_keeps_the_two_newest() {
    let releases: Vec<_> = (1..=4).map(day).collect();
    assert_eq!(releases_to_remove(&releases, 0), vec![day(1), day(2)]);
    assert_eq!(releases_to_remove(&releases, 1), vec![day(1), day(2)]);
}
